//! Startup orchestration.
//!
//! # Responsibilities
//! - Choose the transport from configuration
//! - Bind the listener (HTTP) or attach to stdin/stdout (stdio)
//! - Run until EOF or a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: a bind or bootstrap error at startup is fatal
//! - Listeners start last (traffic only when ready)

use tokio::net::TcpListener;

use crate::capabilities::default_capabilities;
use crate::config::{AppConfig, TransportMode};
use crate::error::StartupError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::protocol::engine::ServerInfo;
use crate::session::factory::build_engine;
use crate::transport::stdio;

/// Run the configured transport until shutdown.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match config.server.transport {
        TransportMode::Stdio => run_stdio(config, &shutdown).await,
        TransportMode::Http => run_http(config, &shutdown).await,
    }
}

async fn run_stdio(config: AppConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let info = ServerInfo {
        name: config.server.name,
        version: config.server.version,
    };
    let engine = build_engine(&default_capabilities(), info).await?;

    stdio::serve(
        &engine,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown.subscribe(),
    )
    .await?;
    Ok(())
}

async fn run_http(config: AppConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        path = %config.http.path,
        "Listening for connections"
    );

    let server = HttpServer::new(config, default_capabilities());
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
