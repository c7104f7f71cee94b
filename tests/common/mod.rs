//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use fitness_mcp::capabilities::{default_capabilities, Capability};
use fitness_mcp::error::EngineError;
use fitness_mcp::protocol::engine::{tool_handler, Engine, ToolDefinition, ToolOutput};
use fitness_mcp::session::SessionRegistry;
use fitness_mcp::{AppConfig, HttpServer, Shutdown};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: SessionRegistry,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }
}

/// Start a server with the default tools.
#[allow(dead_code)]
pub async fn spawn_server(json_response: bool) -> TestServer {
    spawn_server_with(json_response, default_capabilities()).await
}

/// Start a server with a custom capability list.
pub async fn spawn_server_with(json_response: bool, capabilities: Vec<Arc<dyn Capability>>) -> TestServer {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.http.json_response = json_response;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, capabilities);
    let registry = server.registry();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, receiver).await });

    TestServer {
        addr,
        registry,
        shutdown,
        handle,
    }
}

/// Registers a `counter` tool whose count lives in the engine it is bound to.
#[allow(dead_code)]
pub struct Counter;

impl Capability for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn register<'a>(&'a self, engine: &'a mut Engine) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(async move {
            let count = Arc::new(AtomicU64::new(0));
            engine.register_tool(
                ToolDefinition {
                    name: "counter".into(),
                    description: "Increment and return a per-session counter".into(),
                    input_schema: json!({"type": "object"}),
                },
                tool_handler(move |_| {
                    let count = Arc::clone(&count);
                    async move {
                        let value = count.fetch_add(1, Ordering::SeqCst) + 1;
                        Ok(ToolOutput::text(value.to_string()))
                    }
                }),
            )
        })
    }
}

/// Fails registration on the given attempt numbers (1-based).
#[allow(dead_code)]
pub struct FailOn {
    attempts: AtomicUsize,
    failing: Vec<usize>,
}

#[allow(dead_code)]
impl FailOn {
    pub fn new(failing: Vec<usize>) -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failing,
        }
    }
}

impl Capability for FailOn {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn register<'a>(&'a self, _engine: &'a mut Engine) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(async move {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.contains(&attempt) {
                return Err(EngineError::Registration {
                    capability: "flaky",
                    reason: format!("attempt {} rejected", attempt),
                });
            }
            Ok(())
        })
    }
}
