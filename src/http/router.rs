//! Request routing for the MCP endpoint.
//!
//! # Responsibilities
//! - Resolve the session for every request from its headers
//! - Bootstrap a new session when a handshake arrives without one
//! - Forward POST/GET/DELETE to the owning [`SessionTransport`]
//!
//! # Status Mapping
//! ```text
//! POST  known id                  → transport
//! POST  no id + initialize body   → new session → transport
//! POST  anything else             → 400 JSON-RPC envelope
//! GET   known id                  → transport (standalone stream)
//! DELETE known id                 → transport close → 200
//! GET/DELETE missing/unknown id   → 400 text
//! HEAD                            → 200
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::head,
    Router,
};

use crate::http::headers::SessionIdHeader;
use crate::protocol::jsonrpc::{is_initialize_body, JsonRpcError, SERVER_ERROR};
use crate::session::{SessionRegistry, TransportFactory};
use crate::transport::streamable::{json_error, SessionTransport};

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub factory: TransportFactory,
}

impl AppState {
    fn resolve(&self, session_id: Option<&str>) -> Option<Arc<SessionTransport>> {
        session_id.and_then(|id| self.registry.lookup(id))
    }
}

/// Mount the MCP endpoint at `path`.
pub fn routes(path: &str, state: AppState) -> Router {
    Router::new()
        .route(
            path,
            head(handle_head)
                .get(handle_get)
                .post(handle_post)
                .delete(handle_delete),
        )
        .with_state(state)
}

async fn handle_post(
    State(state): State<AppState>,
    SessionIdHeader(session_id): SessionIdHeader,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let transport = match state.resolve(session_id.as_deref()) {
        Some(transport) => transport,
        None if session_id.is_none() && is_initialize_body(&body) => {
            match state.factory.create().await {
                Ok(transport) => transport,
                Err(e) => {
                    tracing::warn!(error = %e, "Session bootstrap failed");
                    return json_error(StatusCode::INTERNAL_SERVER_ERROR, JsonRpcError::internal(e));
                }
            }
        }
        None => {
            tracing::debug!(session_id = ?session_id, "POST without a valid session");
            return json_error(
                StatusCode::BAD_REQUEST,
                JsonRpcError::new(SERVER_ERROR, "Bad Request: No valid session ID provided"),
            );
        }
    };

    transport.handle_post(&headers, body).await
}

async fn handle_get(
    State(state): State<AppState>,
    SessionIdHeader(session_id): SessionIdHeader,
    headers: HeaderMap,
) -> Response {
    match state.resolve(session_id.as_deref()) {
        Some(transport) => transport.handle_get(&headers),
        None => invalid_session(),
    }
}

async fn handle_delete(
    State(state): State<AppState>,
    SessionIdHeader(session_id): SessionIdHeader,
) -> Response {
    match state.resolve(session_id.as_deref()) {
        Some(transport) => transport.handle_delete(),
        None => invalid_session(),
    }
}

async fn handle_head() -> StatusCode {
    StatusCode::OK
}

fn invalid_session() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
}
