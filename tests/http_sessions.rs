//! End-to-end tests for the multi-session HTTP endpoint.

use std::sync::Arc;

use reqwest::{header, StatusCode};
use sdk_rust::McpClient;
use serde_json::{json, Value};

use fitness_mcp::capabilities::default_capabilities;

mod common;

fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn initialize_body() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "raw-client", "version": "1.0.0"}
        },
        "id": 1
    })
}

#[tokio::test]
async fn test_session_flow() {
    let server = common::spawn_server(true).await;
    let mut client = McpClient::new(&server.url());

    let result = client.initialize("flow").await.unwrap();
    assert_eq!(result["serverInfo"]["name"], "fitness-nutrition-mcp");
    assert_eq!(result["protocolVersion"], "2025-03-26");

    let session_id = client.session_id().unwrap().to_string();
    assert!(server.registry.lookup(&session_id).is_some());
    assert_eq!(server.registry.len(), 1);

    let tools = client.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["echo", "generate_workout_plan"]);

    let echoed = client.call_tool("echo", json!({"text": "hello"})).await.unwrap();
    assert_eq!(echoed["content"][0]["text"], "hello");

    assert_eq!(client.close().await.unwrap(), StatusCode::OK);
    assert!(server.registry.lookup(&session_id).is_none());
    assert_eq!(client.close().await.unwrap(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_stream_mode() {
    let server = common::spawn_server(false).await;
    let mut client = McpClient::new(&server.url());

    client.initialize("sse").await.unwrap();
    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 2);

    let plan = client
        .call_tool(
            "generate_workout_plan",
            json!({
                "goal": "muscleGain",
                "daysPerWeek": 4,
                "experienceLevel": "intermediate",
                "hasGymAccess": true
            }),
        )
        .await
        .unwrap();
    let text = plan["content"][0]["text"].as_str().unwrap();
    let plan: Value = serde_json::from_str(text).unwrap();
    assert_eq!(plan["sessionsPerWeek"], 4);
}

#[tokio::test]
async fn test_post_without_session_gets_exact_envelope() {
    let server = common::spawn_server(true).await;
    let res = http()
        .post(server.url())
        .header(header::ACCEPT, "application/json, text/event-stream")
        .json(&json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"Bad Request: No valid session ID provided"},"id":null}"#
    );
    assert!(server.registry.is_empty());
}

#[tokio::test]
async fn test_get_and_delete_without_session() {
    let server = common::spawn_server(true).await;
    let client = http();

    let get = client.get(server.url()).send().await.unwrap();
    assert_eq!(get.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get.text().await.unwrap(), "Invalid or missing session ID");

    let delete = client
        .delete(server.url())
        .header("mcp-session-id", "unknown")
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::BAD_REQUEST);
    assert_eq!(delete.text().await.unwrap(), "Invalid or missing session ID");
}

#[tokio::test]
async fn test_head_is_always_ok() {
    let server = common::spawn_server(true).await;
    let res = http().head(server.url()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = http()
        .head(server.url())
        .header("mcp-session-id", "nope")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_single_mode_accept_is_normalized() {
    let server = common::spawn_server(true).await;

    for accept in ["application/json", "text/event-stream", "*/*"] {
        let res = http()
            .post(server.url())
            .header(header::ACCEPT, accept)
            .json(&initialize_body())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "Accept: {}", accept);
        assert!(res.headers().contains_key("mcp-session-id"));
    }
    assert_eq!(server.registry.len(), 3);
}

#[tokio::test]
async fn test_alias_session_headers() {
    let server = common::spawn_server(true).await;
    let mut client = McpClient::new(&server.url());
    client.initialize("alias").await.unwrap();
    let id = client.session_id().unwrap().to_string();

    for name in ["x-mcp-session-id", "X-MCP-Session"] {
        let res = http()
            .post(server.url())
            .header(header::ACCEPT, "application/json, text/event-stream")
            .header(name, &id)
            .json(&json!({"jsonrpc": "2.0", "method": "ping", "id": 7}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "header {}", name);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["id"], 7);
    }
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let mut capabilities = default_capabilities();
    capabilities.push(Arc::new(common::Counter));
    let server = common::spawn_server_with(true, capabilities).await;

    let mut a = McpClient::new(&server.url());
    let mut b = McpClient::new(&server.url());
    a.initialize("a").await.unwrap();
    b.initialize("b").await.unwrap();
    assert_ne!(a.session_id(), b.session_id());

    for expected in ["1", "2", "3"] {
        let result = a.call_tool("counter", json!({})).await.unwrap();
        assert_eq!(result["content"][0]["text"], expected);
    }
    let result = b.call_tool("counter", json!({})).await.unwrap();
    assert_eq!(result["content"][0]["text"], "1");

    a.close().await.unwrap();
    let result = b.call_tool("counter", json!({})).await.unwrap();
    assert_eq!(result["content"][0]["text"], "2");
}

#[tokio::test]
async fn test_bootstrap_failure_is_scoped_to_one_handshake() {
    let mut capabilities = default_capabilities();
    capabilities.push(Arc::new(common::FailOn::new(vec![2])));
    let server = common::spawn_server_with(true, capabilities).await;

    let mut first = McpClient::new(&server.url());
    first.initialize("first").await.unwrap();

    let res = http()
        .post(server.url())
        .header(header::ACCEPT, "application/json, text/event-stream")
        .json(&initialize_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.headers().contains_key("mcp-session-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(server.registry.len(), 1);

    first.ping().await.unwrap();

    let mut third = McpClient::new(&server.url());
    third.initialize("third").await.unwrap();
    assert_eq!(server.registry.len(), 2);
}

#[tokio::test]
async fn test_concurrent_handshakes_create_distinct_sessions() {
    let server = common::spawn_server(true).await;
    let url = server.url();

    let tasks: Vec<_> = (0..10)
        .map(|n| {
            let url = url.clone();
            tokio::spawn(async move {
                let mut client = McpClient::new(&url);
                client.initialize(&format!("client-{}", n)).await.unwrap();
                client.session_id().unwrap().to_string()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    assert_eq!(server.registry.len(), 10);
}

#[tokio::test]
async fn test_second_initialize_on_session_rejected() {
    let server = common::spawn_server(true).await;
    let mut client = McpClient::new(&server.url());
    client.initialize("twice").await.unwrap();

    let res = client.post_raw(&initialize_body()).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid Request: Server already initialized");
    assert_eq!(server.registry.len(), 1);
}
