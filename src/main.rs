//! Splunk MCP Server Entry Point
//!
//! Initializes logging, loads configuration and starts the server with the
//! selected transport. The first argument (`stdio`, `http` or `sse`)
//! overrides `MCP_TRANSPORT`.

use anyhow::{Context, Result};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use splunk_mcp_server::core::{Config, ToolServer, TransportConfig, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let mut config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level, config.logging.with_timestamps);

    if let Some(mode) = std::env::args().nth(1) {
        let lookup = |key: &str| std::env::var(key).ok();
        config.transport = TransportConfig::from_mode(&mode, &lookup)
            .with_context(|| format!("cannot start in mode '{}'", mode))?;
    }

    info!("Starting {} v{}", config.server.name, config.server.version);
    info!(
        "Splunk backend: {}://{}:{} (TLS verification {})",
        config.backend.scheme,
        config.backend.host,
        config.backend.port,
        if config.backend.verify_tls { "on" } else { "off" }
    );

    let server = ToolServer::new(config.clone()).context("failed to initialize server")?;
    info!("Server initialized with {} tools", server.registry().len());

    // Create and run the transport service
    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs go to stderr; stdout belongs to the STDIO transport.
fn init_logging(level: &str, with_timestamps: bool) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if with_timestamps {
        builder.init();
    } else {
        builder.without_time().init();
    }
}
