//! Newline-delimited JSON-RPC over a byte stream pair (stdin/stdout).
//!
//! One line in, at most one line out. Stdout carries only protocol
//! frames; everything else goes to the logger.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::observability::metrics;
use crate::protocol::engine::Engine;
use crate::protocol::jsonrpc::{parse_messages, IncomingMessage, JsonRpcResponse};

/// Serve `engine` until EOF on `reader` or a shutdown signal.
pub async fn serve<R, W>(
    engine: &Engine,
    reader: R,
    mut writer: W,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    tracing::info!(tools = engine.tool_count(), "Stdio transport ready");

    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read?,
            _ = shutdown.recv() => {
                tracing::info!("Stdio transport shutting down");
                break;
            }
        };

        if read == 0 {
            tracing::info!("Stdin closed");
            break;
        }

        // Bytes go to the parser as-is; invalid UTF-8 is answered as a parse error.
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        metrics::record_stdio_message();
        if let Some(reply) = handle_line(engine, line).await? {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

async fn handle_line(engine: &Engine, line: &[u8]) -> Result<Option<String>, TransportError> {
    let batch = match parse_messages(line) {
        Ok(batch) => batch,
        Err(error) => {
            tracing::debug!(error = %error.message, "Rejected stdio line");
            return Ok(Some(serde_json::to_string(&JsonRpcResponse::detached(error))?));
        }
    };

    let is_batch = batch.is_batch;
    let requests = batch
        .messages
        .into_iter()
        .filter_map(|message| match message {
            IncomingMessage::Request(request) => Some(request),
            IncomingMessage::Response(_) => None,
        })
        .collect();

    let responses = engine.handle_all(requests).await;
    if responses.is_empty() {
        return Ok(None);
    }

    let encoded = if is_batch {
        serde_json::to_string(&responses)?
    } else {
        match responses.first() {
            Some(response) => serde_json::to_string(response)?,
            None => return Ok(None),
        }
    };
    Ok(Some(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{echo::Echo, Capability};
    use crate::lifecycle::Shutdown;
    use crate::protocol::engine::ServerInfo;
    use serde_json::Value;
    use tokio::io::AsyncReadExt;

    async fn engine() -> Engine {
        let mut engine = Engine::new(ServerInfo {
            name: "stdio-test".into(),
            version: "0".into(),
        });
        Echo.register(&mut engine).await.unwrap();
        engine
    }

    async fn run(input: &str) -> Vec<Value> {
        let engine = engine().await;
        let shutdown = Shutdown::new();
        let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);

        client_in.write_all(input.as_bytes()).await.unwrap();
        drop(client_in);

        serve(&engine, server_in, server_out, shutdown.subscribe())
            .await
            .unwrap();

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_request_lines_get_one_reply_each() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"c","version":"1"}},"id":1}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}},"id":2}"#,
            "\n",
        );
        let replies = run(input).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "stdio-test");
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["content"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_parse_error_reply() {
        let replies = run("{not json\n").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_serving() {
        let engine = engine().await;
        let shutdown = Shutdown::new();
        let (mut client_in, server_in) = tokio::io::duplex(1024);
        let (server_out, mut client_out) = tokio::io::duplex(1024);

        client_in
            .write_all(b"\xff\xfe\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n")
            .await
            .unwrap();
        drop(client_in);

        let served = serve(&engine, server_in, server_out, shutdown.subscribe()).await;
        assert!(served.is_ok());

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        let replies: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[1]["id"], 1);
        assert!(replies[1]["result"].is_object());
    }

    #[tokio::test]
    async fn test_batch_reply_is_array() {
        let replies = run(
            "[{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1},{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":2}]\n",
        )
        .await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving() {
        let engine = engine().await;
        let shutdown = Shutdown::new();
        let (_client_in, server_in) = tokio::io::duplex(1024);
        let (server_out, _client_out) = tokio::io::duplex(1024);
        let receiver = shutdown.subscribe();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let served = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve(&engine, server_in, server_out, receiver),
        )
        .await;
        assert!(matches!(served, Ok(Ok(()))));
    }
}
