//! JSON-RPC 2.0 envelopes and message classification.
//!
//! # JSON-RPC 2.0 Compliance
//! - Requests carry `id`, `method` and optional `params`
//! - Notifications are requests without `id` and never get a response
//! - Batches are arrays of messages; an empty batch is invalid
//! - Objects with `result` or `error` and no `method` are client responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method name of the session handshake.
pub const INITIALIZE_METHOD: &str = "initialize";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Implementation-defined server error (transport level).
pub const SERVER_ERROR: i32 = -32000;
pub const SESSION_NOT_FOUND: i32 = -32001;

/// An inbound request or notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: Some(id.into()),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(INVALID_REQUEST, format!("Invalid Request: {}", detail))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: {}", detail))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, format!("Internal error: {}", detail))
    }
}

/// An outbound response. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Error envelope for failures that cannot be tied to a request id.
    pub fn detached(error: JsonRpcError) -> Self {
        Self::failure(Value::Null, error)
    }
}

/// Client identity sent with the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// Parameters of an `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: serde_json::Map<String, Value>,
    pub client_info: Implementation,
}

/// A single classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// Request or notification addressed to the engine.
    Request(JsonRpcRequest),
    /// Response from the client to a server-initiated request.
    Response(Value),
}

impl IncomingMessage {
    pub fn as_request(&self) -> Option<&JsonRpcRequest> {
        match self {
            IncomingMessage::Request(request) => Some(request),
            IncomingMessage::Response(_) => None,
        }
    }
}

/// The messages found in one request body or one stdio line.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBatch {
    pub messages: Vec<IncomingMessage>,
    /// Whether the payload was a JSON array (responses mirror the shape).
    pub is_batch: bool,
}

impl MessageBatch {
    pub fn requests(&self) -> impl Iterator<Item = &JsonRpcRequest> {
        self.messages.iter().filter_map(IncomingMessage::as_request)
    }

    /// True when at least one message expects a response.
    pub fn expects_response(&self) -> bool {
        self.requests().any(|r| !r.is_notification())
    }

    pub fn initialize_count(&self) -> usize {
        self.requests()
            .filter(|r| r.method == INITIALIZE_METHOD)
            .count()
    }
}

/// Parse raw bytes into a batch of classified messages.
pub fn parse_messages(bytes: &[u8]) -> Result<MessageBatch, JsonRpcError> {
    let value: Value = serde_json::from_slice(bytes).map_err(JsonRpcError::parse_error)?;
    classify(value)
}

/// Classify an already-decoded payload.
pub fn classify(value: Value) -> Result<MessageBatch, JsonRpcError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(JsonRpcError::invalid_request("empty batch"));
            }
            let messages = items
                .into_iter()
                .map(classify_one)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MessageBatch {
                messages,
                is_batch: true,
            })
        }
        other => Ok(MessageBatch {
            messages: vec![classify_one(other)?],
            is_batch: false,
        }),
    }
}

fn classify_one(value: Value) -> Result<IncomingMessage, JsonRpcError> {
    let Some(object) = value.as_object() else {
        return Err(JsonRpcError::invalid_request("message must be an object"));
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request("jsonrpc must be \"2.0\""));
    }

    if object.contains_key("method") {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(JsonRpcError::invalid_request)?;
        return Ok(IncomingMessage::Request(request));
    }

    if object.contains_key("result") || object.contains_key("error") {
        return Ok(IncomingMessage::Response(value));
    }

    Err(JsonRpcError::invalid_request(
        "message is neither a request nor a response",
    ))
}

/// Returns true when `value` is a well-formed `initialize` request.
pub fn is_initialize_request(value: &Value) -> bool {
    let Ok(request) = serde_json::from_value::<JsonRpcRequest>(value.clone()) else {
        return false;
    };
    request.jsonrpc == JSONRPC_VERSION
        && request.method == INITIALIZE_METHOD
        && request.id.is_some()
        && request
            .params
            .is_some_and(|params| serde_json::from_value::<InitializeParams>(params).is_ok())
}

/// Returns true when the raw body holds a single well-formed `initialize` request.
pub fn is_initialize_body(bytes: &[u8]) -> bool {
    serde_json::from_slice::<Value>(bytes)
        .map(|value| is_initialize_request(&value))
        .unwrap_or(false)
}
