//! Header handling for the streamable HTTP endpoint.
//!
//! # Responsibilities
//! - Normalize `Accept` so every request supports both reply modes
//! - Resolve the session ID from a fixed, priority-ordered list of header names
//!
//! # Design Decisions
//! - Missing tokens replace the whole header with the canonical pair;
//!   extra client tokens are discarded
//! - Header names are matched case-insensitively (HeaderMap stores them lowercased)

use std::borrow::Cow;
use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Accept value installed when the client advertises only one reply mode.
pub const CANONICAL_ACCEPT: &str = "application/json, text/event-stream";

/// Canonical session header, read first and written on responses.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Session header names in lookup priority order.
pub const SESSION_ID_HEADER_NAMES: [&str; 3] = [SESSION_ID_HEADER, "x-mcp-session-id", "x-mcp-session"];

/// Case-insensitive substring match of a media type token.
pub fn accepts(accept: &str, media_type: &str) -> bool {
    accept.to_ascii_lowercase().contains(media_type)
}

/// True when `accept` allows both JSON replies and event streams.
pub fn accepts_both(accept: &str) -> bool {
    accepts(accept, JSON_MEDIA_TYPE) && accepts(accept, EVENT_STREAM_MEDIA_TYPE)
}

/// Correct a raw Accept value. Idempotent.
pub fn normalize_accept(raw: Option<&str>) -> Cow<'_, str> {
    match raw {
        Some(value) if accepts_both(value) => Cow::Borrowed(value),
        _ => Cow::Borrowed(CANONICAL_ACCEPT),
    }
}

/// Apply [`normalize_accept`] to a header map in place.
pub fn normalize_accept_header(headers: &mut HeaderMap) {
    let corrected = {
        let raw = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
        match normalize_accept(raw) {
            Cow::Borrowed(value) if raw == Some(value) => return,
            corrected => HeaderValue::from_str(&corrected),
        }
    };
    match corrected {
        Ok(value) => {
            tracing::trace!(accept = ?value, "Rewriting Accept header");
            headers.insert(header::ACCEPT, value);
        }
        Err(e) => tracing::warn!(error = %e, "Unusable Accept correction"),
    }
}

/// Middleware running the Accept correction before any handler.
pub async fn normalize_accept_layer(mut request: Request, next: Next) -> Response {
    normalize_accept_header(request.headers_mut());
    next.run(request).await
}

/// First non-empty session ID found in [`SESSION_ID_HEADER_NAMES`] order.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    SESSION_ID_HEADER_NAMES.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// Extractor for the session ID header; never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdHeader(pub Option<String>);

impl<S> FromRequestParts<S> for SessionIdHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_id(&parts.headers).map(str::to_owned)))
    }
}
