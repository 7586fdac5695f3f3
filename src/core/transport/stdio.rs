//! STDIO transport implementation.
//!
//! Newline-delimited JSON over standard input/output. One frame is read,
//! fully processed and answered before the next is read, so responses come
//! out in request order. Malformed frames are answered with a `parse_error`
//! envelope and the adapter keeps reading; end of input closes it cleanly.
//! Logs go to stderr so stdout only ever carries response frames.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::TransportResult;
use super::protocol;
use crate::core::ToolServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run the STDIO transport on the process's stdin/stdout.
    pub async fn run(server: ToolServer) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");
        Self::serve(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        info!("STDIO transport finished");
        Ok(())
    }

    /// Serve frames from `reader` until end of input.
    ///
    /// Read and write errors are fatal and end the adapter.
    pub async fn serve<R, W>(server: &ToolServer, mut reader: R, mut writer: W) -> TransportResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                debug!("End of input");
                return Ok(());
            }

            let frame = line.trim_ascii();
            if frame.is_empty() {
                continue;
            }

            let Some(reply) = protocol::respond(server, frame).await else {
                continue;
            };
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }
}
