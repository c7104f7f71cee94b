//! Streamable HTTP transport bound to a single session.
//!
//! # Responsibilities
//! - Validate negotiation headers and JSON-RPC payloads for one session
//! - Drive the session's engine and reply with JSON or an event stream
//! - Hold the standalone server-to-client stream opened by GET
//! - Report "established" and "closed" exactly once to a [`SessionObserver`]
//!
//! # Lifecycle
//! ```text
//! new ──initialize POST──▶ established ──DELETE / shutdown──▶ closed
//!  │                            │
//!  └─ dropped if the handshake  └─ every POST/GET after close answers 404
//!     is rejected (never registered)
//! ```

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::{future, stream, StreamExt};
use tokio::sync::watch;

use crate::error::{SessionError, TransportError};
use crate::http::headers::{accepts, accepts_both, EVENT_STREAM_MEDIA_TYPE, JSON_MEDIA_TYPE, SESSION_ID_HEADER};
use crate::protocol::engine::Engine;
use crate::protocol::jsonrpc::{
    parse_messages, IncomingMessage, JsonRpcError, JsonRpcResponse, SERVER_ERROR, SESSION_NOT_FOUND,
};

/// Receives the two lifecycle events of a session.
///
/// `session_established` fires before the handshake is processed;
/// `session_closed` fires once, at teardown.
pub trait SessionObserver: Send + Sync {
    fn session_established(&self, transport: &Arc<SessionTransport>) -> Result<(), SessionError>;
    fn session_closed(&self, session_id: &str);
}

/// How POST replies are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One `application/json` body.
    Json,
    /// A `text/event-stream` with one `message` event per response.
    EventStream,
}

/// The transport half of a session; owns the session's engine.
pub struct SessionTransport {
    session_id: String,
    engine: Engine,
    mode: ResponseMode,
    observer: Arc<dyn SessionObserver>,
    established: AtomicBool,
    standalone_stream: AtomicBool,
    closed: watch::Sender<bool>,
}

impl SessionTransport {
    pub fn new(
        session_id: String,
        engine: Engine,
        mode: ResponseMode,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            session_id,
            engine,
            mode,
            observer,
            established: AtomicBool::new(false),
            standalone_stream: AtomicBool::new(false),
            closed,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Close the session. Only the first call succeeds and notifies the observer.
    pub fn close(&self) -> Result<(), TransportError> {
        if self.closed.send_replace(true) {
            return Err(TransportError::Closed(self.session_id.clone()));
        }
        tracing::info!(session_id = %self.session_id, "Session closed");
        self.observer.session_closed(&self.session_id);
        Ok(())
    }

    /// Handle a POST carrying one message or a batch.
    pub async fn handle_post(self: &Arc<Self>, headers: &HeaderMap, body: Bytes) -> Response {
        if self.is_closed() {
            return session_gone();
        }

        if !accepts_both(header_str(headers, header::ACCEPT)) {
            return json_error(
                StatusCode::NOT_ACCEPTABLE,
                JsonRpcError::new(
                    SERVER_ERROR,
                    "Not Acceptable: Client must accept both application/json and text/event-stream",
                ),
            );
        }

        if !accepts(header_str(headers, header::CONTENT_TYPE), JSON_MEDIA_TYPE) {
            return json_error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                JsonRpcError::new(
                    SERVER_ERROR,
                    "Unsupported Media Type: Content-Type must be application/json",
                ),
            );
        }

        let batch = match parse_messages(&body) {
            Ok(batch) => batch,
            Err(error) => {
                tracing::debug!(session_id = %self.session_id, error = %error.message, "Rejected payload");
                return json_error(StatusCode::BAD_REQUEST, error);
            }
        };

        if batch.initialize_count() > 0 {
            if batch.messages.len() > 1 {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    JsonRpcError::invalid_request("Only one initialization request is allowed"),
                );
            }
            if let Err(response) = self.establish() {
                return response;
            }
        } else if !self.is_established() {
            return json_error(
                StatusCode::BAD_REQUEST,
                JsonRpcError::new(SERVER_ERROR, "Bad Request: Server not initialized"),
            );
        }

        let expects_response = batch.expects_response();
        let is_batch = batch.is_batch;
        let requests: Vec<_> = batch
            .messages
            .into_iter()
            .filter_map(|message| match message {
                IncomingMessage::Request(request) => Some(request),
                IncomingMessage::Response(_) => None,
            })
            .collect();

        tracing::debug!(
            session_id = %self.session_id,
            messages = requests.len(),
            "Dispatching to engine"
        );

        let responses = tokio::select! {
            responses = self.engine.handle_all(requests) => responses,
            _ = wait_closed(self.closed.subscribe()) => {
                tracing::debug!(session_id = %self.session_id, "Session closed while handling request");
                return session_gone();
            }
        };

        if !expects_response {
            return self.with_session_header(StatusCode::ACCEPTED.into_response());
        }

        let response = match self.mode {
            ResponseMode::Json if is_batch => Json(responses).into_response(),
            ResponseMode::Json => match responses.into_iter().next() {
                Some(response) => Json(response).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            },
            ResponseMode::EventStream => {
                let events = responses
                    .into_iter()
                    .map(|response| Event::default().event("message").json_data(response));
                Sse::new(stream::iter(events)).into_response()
            }
        };
        self.with_session_header(response)
    }

    /// Open the standalone server-to-client stream. One per session.
    pub fn handle_get(self: &Arc<Self>, headers: &HeaderMap) -> Response {
        if self.is_closed() {
            return session_gone();
        }

        if !accepts(header_str(headers, header::ACCEPT), EVENT_STREAM_MEDIA_TYPE) {
            return json_error(
                StatusCode::NOT_ACCEPTABLE,
                JsonRpcError::new(
                    SERVER_ERROR,
                    "Not Acceptable: Client must accept text/event-stream",
                ),
            );
        }

        if self.standalone_stream.swap(true, Ordering::SeqCst) {
            return json_error(
                StatusCode::CONFLICT,
                JsonRpcError::new(
                    SERVER_ERROR,
                    "Conflict: Only one SSE stream is allowed per session",
                ),
            );
        }

        tracing::debug!(session_id = %self.session_id, "Standalone stream opened");
        let guard = StreamGuard(Arc::clone(self));
        let closed = self.closed.subscribe();
        let events = stream::once(async move {
            let _guard = guard;
            wait_closed(closed).await;
        })
        .filter_map(|()| future::ready(None::<Result<Event, Infallible>>));

        let response = Sse::new(events)
            .keep_alive(KeepAlive::default())
            .into_response();
        self.with_session_header(response)
    }

    /// Terminate the session on client request.
    pub fn handle_delete(self: &Arc<Self>) -> Response {
        match self.close() {
            Ok(()) => self.with_session_header(StatusCode::OK.into_response()),
            Err(e) => {
                tracing::debug!(error = %e, "Close requested twice");
                session_gone()
            }
        }
    }

    fn establish(self: &Arc<Self>) -> Result<(), Response> {
        if self
            .established
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                JsonRpcError::invalid_request("Server already initialized"),
            ));
        }

        if let Err(e) = self.observer.session_established(self) {
            tracing::error!(session_id = %self.session_id, error = %e, "Failed to register session");
            return Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                JsonRpcError::internal(e),
            ));
        }

        tracing::info!(session_id = %self.session_id, "Session established");
        Ok(())
    }

    fn with_session_header(&self, mut response: Response) -> Response {
        if let Ok(value) = HeaderValue::from_str(&self.session_id) {
            response.headers_mut().insert(SESSION_ID_HEADER, value);
        }
        response
    }
}

impl fmt::Debug for SessionTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTransport")
            .field("session_id", &self.session_id)
            .field("mode", &self.mode)
            .field("established", &self.is_established())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Clears the standalone-stream slot when the GET stream is dropped.
struct StreamGuard(Arc<SessionTransport>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.standalone_stream.store(false, Ordering::SeqCst);
        tracing::debug!(session_id = %self.0.session_id, "Standalone stream closed");
    }
}

async fn wait_closed(mut closed: watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// A JSON-RPC error envelope with `id: null` and the given status.
pub fn json_error(status: StatusCode, error: JsonRpcError) -> Response {
    (status, Json(JsonRpcResponse::detached(error))).into_response()
}

fn session_gone() -> Response {
    json_error(
        StatusCode::NOT_FOUND,
        JsonRpcError::new(SESSION_NOT_FOUND, "Session not found"),
    )
}
