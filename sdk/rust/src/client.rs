//! Minimal client for the fitness-mcp streamable HTTP endpoint.
//!
//! Tracks the session ID returned by the handshake and decodes replies
//! in either mode (plain JSON or `text/event-stream`).

use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const ACCEPT_BOTH: &str = "application/json, text/event-stream";

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// A decoded reply: the HTTP status plus any JSON-RPC messages in the body.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub session_id: Option<String>,
    pub messages: Vec<Value>,
}

impl Reply {
    /// The message answering request `id`, if present.
    pub fn for_id(&self, id: u64) -> Option<&Value> {
        self.messages.iter().find(|m| m["id"] == json!(id))
    }
}

pub struct McpClient {
    client: Client,
    endpoint: String,
    session_id: Option<String>,
    next_id: u64,
}

impl McpClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.to_string(),
            session_id: None,
            next_id: 1,
        }
    }

    /// Resume an existing session.
    pub fn with_session(endpoint: &str, session_id: &str) -> Self {
        let mut client = Self::new(endpoint);
        client.session_id = Some(session_id.to_string());
        client
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a raw JSON body with the current session header.
    pub async fn post_raw(&self, body: &Value) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, ACCEPT_BOTH)
            .json(body);
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }
        request.send().await
    }

    /// POST `body` and decode the reply, remembering any session ID handed out.
    pub async fn send(&mut self, body: &Value) -> ClientResult<Reply> {
        let response = self.post_raw(body).await?;
        let reply = decode(response).await?;
        if let Some(id) = &reply.session_id {
            self.session_id = Some(id.clone());
        }
        Ok(reply)
    }

    /// Send a request and return its `result`.
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> ClientResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut body = json!({ "jsonrpc": "2.0", "method": method, "id": id });
        if let Some(params) = params {
            body["params"] = params;
        }

        let reply = self.send(&body).await?;
        if !reply.status.is_success() {
            return Err(format!("server returned {}: {:?}", reply.status, reply.messages).into());
        }

        let message = reply
            .for_id(id)
            .cloned()
            .ok_or_else(|| format!("no response for request {}", id))?;
        if let Some(error) = message.get("error") {
            let error: RpcError = serde_json::from_value(error.clone())?;
            return Err(format!("{} ({})", error.message, error.code).into());
        }
        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Send a notification. Returns the HTTP status.
    pub async fn notify(&mut self, method: &str) -> ClientResult<StatusCode> {
        let reply = self
            .send(&json!({ "jsonrpc": "2.0", "method": method }))
            .await?;
        Ok(reply.status)
    }

    /// Perform the handshake and the `initialized` notification.
    pub async fn initialize(&mut self, client_name: &str) -> ClientResult<Value> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": { "name": client_name, "version": env!("CARGO_PKG_VERSION") }
                })),
            )
            .await?;
        self.notify("notifications/initialized").await?;
        Ok(result)
    }

    pub async fn ping(&mut self) -> ClientResult<Value> {
        self.request("ping", None).await
    }

    pub async fn list_tools(&mut self) -> ClientResult<Vec<Value>> {
        let result = self.request("tools/list", None).await?;
        Ok(result["tools"].as_array().cloned().unwrap_or_default())
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<Value> {
        self.request(
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    /// Terminate the session. Returns the HTTP status of the DELETE.
    pub async fn close(&self) -> Result<StatusCode, reqwest::Error> {
        let mut request = self.client.delete(&self.endpoint);
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }
        Ok(request.send().await?.status())
    }
}

async fn decode(response: Response) -> ClientResult<Reply> {
    let status = response.status();
    let session_id = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let is_stream = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));
    let text = response.text().await?;

    let messages = if is_stream {
        parse_event_stream(&text)?
    } else if text.trim().is_empty() {
        Vec::new()
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            Ok(value) => vec![value],
            // Plain-text error bodies (e.g. "Invalid or missing session ID").
            Err(_) => vec![Value::String(text)],
        }
    };

    Ok(Reply {
        status,
        session_id,
        messages,
    })
}

/// Collect the JSON payloads of every event in an SSE body.
pub fn parse_event_stream(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    let mut messages = Vec::new();
    for block in text.split("\n\n") {
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|line| line.strip_prefix(' ').unwrap_or(line))
            .collect();
        if data.is_empty() {
            continue;
        }
        messages.push(serde_json::from_str(&data.join("\n"))?);
    }
    Ok(messages)
}
