//! `echo` tool: returns its input text unchanged.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

use super::{parse_args, Capability};
use crate::error::EngineError;
use crate::protocol::engine::{tool_handler, Engine, ToolDefinition, ToolOutput};

#[derive(Debug, Deserialize)]
struct EchoArgs {
    text: String,
}

pub struct Echo;

impl Capability for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn register<'a>(&'a self, engine: &'a mut Engine) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(async move {
            engine.register_tool(
                ToolDefinition {
                    name: "echo".to_string(),
                    description: "Echo back the provided text.".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "text": { "type": "string", "description": "Text to echo back" }
                        },
                        "required": ["text"]
                    }),
                },
                tool_handler(|arguments| async move {
                    parse_args(arguments).map(|args: EchoArgs| ToolOutput::text(args.text))
                }),
            )
        })
    }
}
