//! fitness-mcp server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   stdio mode                          http mode
//!   ──────────                          ─────────
//!   stdin ─▶ stdio transport            client ─▶ axum (normalize Accept, CORS,
//!              │                                  limits, request id, trace)
//!              ▼                                    │
//!           engine                                  ▼
//!              │                               router ──▶ registry (DashMap)
//!   stdout ◀───┘                                 │  └──▶ factory (new engine
//!                                                │        + capabilities)
//!                                                ▼
//!                                       session transport ─▶ engine
//! ```

use std::path::PathBuf;

use clap::Parser;

use fitness_mcp::config::loader::{resolve_config, ConfigError};
use fitness_mcp::config::validation::validate_config;
use fitness_mcp::config::TransportMode;
use fitness_mcp::lifecycle::startup;
use fitness_mcp::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "fitness-mcp")]
#[command(about = "Fitness & nutrition MCP tool server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Transport to serve on (overrides config and MCP_TRANSPORT)
    #[arg(short, long, value_enum)]
    transport: Option<TransportMode>,

    /// Listen address for the HTTP transport
    #[arg(short, long)]
    bind: Option<String>,

    /// Reply to POSTs with a single JSON body instead of an event stream
    #[arg(long)]
    json_response: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = resolve_config(cli.config.as_deref())?;
    if let Some(transport) = cli.transport {
        config.server.transport = transport;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if cli.json_response {
        config.http.json_response = true;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        name = %config.server.name,
        version = %config.server.version,
        transport = ?config.server.transport,
        "fitness-mcp starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
