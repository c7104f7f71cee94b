//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router for the MCP endpoint
//! - Wire up middleware (Accept normalization, CORS, limits, request ID, tracing, metrics)
//! - Own the session registry shared by every handler
//! - Close all sessions before the listener stops

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::capabilities::Capability;
use crate::config::{AppConfig, CorsConfig};
use crate::http::headers::{normalize_accept_layer, SESSION_ID_HEADER, SESSION_ID_HEADER_NAMES};
use crate::http::router::{routes, AppState};
use crate::lifecycle::shutdown::close_all_sessions;
use crate::observability::metrics;
use crate::protocol::engine::ServerInfo;
use crate::session::{SessionRegistry, TransportFactory};
use crate::transport::ResponseMode;

/// HTTP server multiplexing MCP sessions on one path.
pub struct HttpServer {
    router: Router,
    registry: SessionRegistry,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `capabilities` in every session.
    pub fn new(config: AppConfig, capabilities: Vec<Arc<dyn Capability>>) -> Self {
        let registry = SessionRegistry::new();
        let mode = if config.http.json_response {
            ResponseMode::Json
        } else {
            ResponseMode::EventStream
        };
        let factory = TransportFactory::new(
            capabilities,
            ServerInfo {
                name: config.server.name.clone(),
                version: config.server.version.clone(),
            },
            mode,
            Arc::new(registry.clone()),
        );

        let state = AppState {
            registry: registry.clone(),
            factory,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            registry,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        routes(&config.http.path, state)
            .layer(middleware::from_fn(track_metrics))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(RequestBodyLimitLayer::new(config.http.max_body_bytes))
            .layer(cors_layer(&config.cors))
            .layer(middleware::from_fn(normalize_accept_layer))
    }

    /// Handle to the live session table.
    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then close every session and drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.http.path,
            json_response = self.config.http.json_response,
            "HTTP server starting"
        );

        let registry = self.registry.clone();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                let report = close_all_sessions(&registry);
                tracing::info!(
                    attempted = report.attempted,
                    failed = report.failed,
                    "Sessions closed"
                );
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    // "*" cannot be combined with credentials, so reflect the caller's origin instead.
    let origin = if config.origin == "*" {
        AllowOrigin::mirror_request()
    } else {
        match HeaderValue::from_str(&config.origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(origin = %config.origin, error = %e, "Invalid CORS origin, denying cross-origin requests");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    let mut allowed_headers = vec![header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION];
    allowed_headers.extend(SESSION_ID_HEADER_NAMES.iter().copied().map(HeaderName::from_static));
    allowed_headers.push(HeaderName::from_static("mcp-protocol-version"));
    allowed_headers.push(HeaderName::from_static("last-event-id"));

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(allowed_headers)
        .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)])
        .allow_credentials(config.allow_credentials)
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
