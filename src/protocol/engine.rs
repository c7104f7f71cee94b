//! Protocol engine: the per-session tool table and method dispatch.
//!
//! An engine is built once, filled by capability modules through
//! [`Engine::register_tool`], and then handed to exactly one transport.
//! After that it is only read, so `handle` takes `&self`.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::protocol::jsonrpc::{
    InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, INITIALIZE_METHOD,
};

/// Newest protocol revision this server speaks.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 4] =
    ["2025-06-18", "2025-03-26", "2024-11-05", "2024-10-07"];

/// Name and version reported in the `initialize` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool metadata returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A single content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Failure reported by a tool handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Arguments did not match the tool's input schema.
    InvalidArguments(String),
    /// The tool ran and failed.
    Failed(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::InvalidArguments(e) => write!(f, "invalid arguments: {}", e),
            ToolError::Failed(e) => write!(f, "{}", e),
        }
    }
}

pub type ToolFuture = BoxFuture<'static, Result<ToolOutput, ToolError>>;

/// Async tool handler; receives the raw `arguments` object.
pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

#[derive(Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Per-session protocol engine.
pub struct Engine {
    info: ServerInfo,
    tools: Vec<RegisteredTool>,
}

impl Engine {
    pub fn new(info: ServerInfo) -> Self {
        Self {
            info,
            tools: Vec::new(),
        }
    }

    /// Register a tool. Names are unique per engine.
    pub fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: ToolHandler,
    ) -> Result<(), EngineError> {
        if self.tools.iter().any(|t| t.definition.name == definition.name) {
            return Err(EngineError::DuplicateTool(definition.name));
        }
        tracing::debug!(tool = %definition.name, "Tool registered");
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
        Ok(())
    }

    /// Tool definitions in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Handle one request. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::trace!(method = %request.method, "Notification received");
            return None;
        };

        let result = match request.method.as_str() {
            INITIALIZE_METHOD => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tool_definitions() })),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    /// Handle requests one after another, keeping only the responses.
    pub async fn handle_all(&self, requests: Vec<JsonRpcRequest>) -> Vec<JsonRpcResponse> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(response) = self.handle(request).await {
                responses.push(response);
            }
        }
        responses
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing initialize params"))
            .and_then(|p| serde_json::from_value(p).map_err(JsonRpcError::invalid_params))?;

        let protocol_version = negotiate_version(&params.protocol_version);
        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            requested = %params.protocol_version,
            negotiated = protocol_version,
            "Client initialized"
        );

        Ok(json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": {},
                "prompts": {},
            },
            "serverInfo": self.info,
        }))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing tools/call params"))
            .and_then(|p| serde_json::from_value(p).map_err(JsonRpcError::invalid_params))?;

        let tool = self
            .tools
            .iter()
            .find(|t| t.definition.name == params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Tool {} not found", params.name)))?;

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let output = match (tool.handler)(arguments).await {
            Ok(output) => output,
            Err(ToolError::InvalidArguments(e)) => {
                return Err(JsonRpcError::invalid_params(format!(
                    "Invalid arguments for tool {}: {}",
                    params.name, e
                )));
            }
            Err(ToolError::Failed(e)) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool execution failed");
                ToolOutput::error(e)
            }
        };

        serde_json::to_value(output).map_err(JsonRpcError::internal)
    }
}

/// Echo the client's version when supported, otherwise offer the latest.
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// Build a [`ToolHandler`] from an async closure.
pub fn tool_handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
{
    Arc::new(move |args| -> ToolFuture { Box::pin(f(args)) })
}
