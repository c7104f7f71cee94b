use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::{json, Value};

const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Parser)]
#[command(name = "mcp-cli")]
#[command(about = "Development CLI for the fitness-mcp HTTP endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000/mcp")]
    url: String,

    /// Session ID returned by `init`
    #[arg(short, long, env = "MCP_SESSION")]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session and print its ID
    Init,
    /// Check the session is alive
    Ping,
    /// List the tools of the session
    Tools,
    /// Call a tool with JSON arguments
    Call {
        name: String,
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// POST a raw JSON-RPC message or batch
    Send { message: String },
    /// Terminate the session
    Close,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
    if let Some(session) = &cli.session {
        headers.insert(SESSION_HEADER, HeaderValue::from_str(session)?);
    }

    let body = match cli.command {
        Commands::Init => json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "mcp-cli", "version": env!("CARGO_PKG_VERSION") }
            },
            "id": 1
        }),
        Commands::Ping => json!({ "jsonrpc": "2.0", "method": "ping", "id": 1 }),
        Commands::Tools => json!({ "jsonrpc": "2.0", "method": "tools/list", "id": 1 }),
        Commands::Call { name, arguments } => {
            let arguments: Value = serde_json::from_str(&arguments)?;
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments },
                "id": 1
            })
        }
        Commands::Send { message } => serde_json::from_str(&message)?,
        Commands::Close => {
            let res = client.delete(&cli.url).headers(headers).send().await?;
            println!("{}", res.status());
            return Ok(());
        }
    };

    let res = client.post(&cli.url).headers(headers).json(&body).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(session) = res.headers().get(SESSION_HEADER) {
        eprintln!("Session: {}", session.to_str()?);
    }
    let is_stream = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let payloads: Vec<&str> = if is_stream {
        text.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect()
    } else {
        vec![text.as_str()]
    };

    for payload in payloads.into_iter().filter(|p| !p.trim().is_empty()) {
        let json: Value = serde_json::from_str(payload)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
