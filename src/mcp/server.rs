//! MCP stdio server
//!
//! Reads newline-delimited JSON-RPC messages, answers lifecycle and listing
//! requests inline, and runs each `tools/call` on its own task so a slow
//! synthesis never blocks a concurrent transcription. All responses go
//! through a single writer task, one JSON object per line.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::types::*;
use crate::tools::{ToolError, ToolExecutionContext, ToolRegistry};

/// Longest accepted inbound line
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

const INSTRUCTIONS: &str = "Use text_to_speech to synthesize Cantonese speech into an audio file \
     and speech_to_text to transcribe a local audio file. Both tools need CANTONESE_AI_API_KEY.";

/// One framed read from the host
#[derive(Debug, PartialEq)]
enum Inbound {
    Line(Vec<u8>),
    /// A line over the limit; its bytes were skipped through the newline
    Oversized,
    Eof,
}

/// Read the next newline-terminated message, holding at most `max` bytes.
/// An oversized line is consumed and reported without ending the stream.
async fn read_message<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<Inbound>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut oversized = false;

    loop {
        let (used, complete) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(if oversized {
                    Inbound::Oversized
                } else if buf.is_empty() {
                    Inbound::Eof
                } else {
                    Inbound::Line(std::mem::take(buf))
                });
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let chunk = newline.map_or(available, |i| &available[..i]);
            if !oversized {
                if buf.len() + chunk.len() > max {
                    oversized = true;
                    buf.clear();
                } else {
                    buf.extend_from_slice(chunk);
                }
            }
            (newline.map_or(available.len(), |i| i + 1), newline.is_some())
        };
        reader.consume(used);

        if complete {
            return Ok(if oversized {
                Inbound::Oversized
            } else {
                Inbound::Line(std::mem::take(buf))
            });
        }
    }
}

enum Dispatch {
    Reply(JsonRpcResponse),
    CallTool { id: Value, params: CallToolParams },
    Silent,
}

pub struct McpServer {
    registry: Arc<ToolRegistry>,
    working_directory: PathBuf,
    server_info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            server_info: ServerInfo {
                name: crate::APP_NAME.to_string(),
                version: crate::VERSION.to_string(),
            },
        }
    }

    /// Anchor for relative paths in tool arguments
    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.working_directory = dir;
        self
    }

    pub async fn serve_stdio(self) -> Result<(), McpError> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until the reader hits EOF, then wait for in-flight calls to
    /// finish writing their responses.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<(), McpError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut in_flight = JoinSet::new();

        tracing::info!(
            tools = server.registry.count(),
            "MCP server listening on stdio"
        );

        loop {
            let line = match read_message(&mut reader, &mut buf, MAX_LINE_BYTES).await {
                Ok(Inbound::Line(line)) => line,
                Ok(Inbound::Oversized) => {
                    tracing::warn!("Dropping oversized message (> {} bytes)", MAX_LINE_BYTES);
                    let _ = tx.send(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        "Message too large",
                    ));
                    continue;
                }
                Ok(Inbound::Eof) => break,
                Err(e) => {
                    tracing::error!("Failed to read from host: {}", e);
                    break;
                }
            };

            let line = match std::str::from_utf8(&line) {
                Ok(line) => line.trim(),
                Err(e) => {
                    let _ = tx.send(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ));
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match server.dispatch(line) {
                Dispatch::Reply(response) => {
                    let _ = tx.send(response);
                }
                Dispatch::CallTool { id, params } => {
                    let server = server.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let response = server.run_tool_call(id, params).await;
                        let _ = tx.send(response);
                    });
                }
                Dispatch::Silent => {}
            }

            while in_flight.try_join_next().is_some() {}
        }

        tracing::info!("Host closed stdin; draining {} in-flight call(s)", in_flight.len());
        while in_flight.join_next().await.is_some() {}
        drop(tx);

        writer_task
            .await
            .map_err(|e| McpError::Writer(e.to_string()))??;
        Ok(())
    }

    fn dispatch(&self, line: &str) -> Dispatch {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Unparseable message from host: {}", e);
                return Dispatch::Reply(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if value.is_array() {
            return Dispatch::Reply(JsonRpcResponse::failure(
                Value::Null,
                INVALID_REQUEST,
                "Batch requests are not supported",
            ));
        }

        let message: IncomingMessage = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                return Dispatch::Reply(JsonRpcResponse::failure(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        if message.jsonrpc.as_deref() != Some("2.0") {
            tracing::debug!("Message without jsonrpc 2.0 marker; handling anyway");
        }

        let Some(method) = message.method else {
            tracing::debug!("Ignoring response-shaped message: id={:?}", message.id);
            return Dispatch::Silent;
        };

        let Some(id) = message.id else {
            self.handle_notification(&method);
            return Dispatch::Silent;
        };

        match method.as_str() {
            "initialize" => Dispatch::Reply(self.initialize(id, message.params)),
            "ping" => Dispatch::Reply(JsonRpcResponse::success(id, serde_json::json!({}))),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.registry.get_tool_definitions(),
                };
                Dispatch::Reply(to_response(id, &result))
            }
            "tools/call" => {
                let params = message.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallToolParams>(params) {
                    Ok(params) => Dispatch::CallTool { id, params },
                    Err(e) => Dispatch::Reply(JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid tools/call params: {}", e),
                    )),
                }
            }
            other => {
                tracing::debug!("Unsupported method: {}", other);
                Dispatch::Reply(JsonRpcResponse::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                ))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::info!("Host finished initialization"),
            "notifications/cancelled" => tracing::debug!("Host cancelled a request"),
            other => tracing::debug!("Ignoring notification: {}", other),
        }
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.and_then(|p| serde_json::from_value::<InitializeParams>(p).ok());
        let requested = params.as_ref().and_then(|p| p.protocol_version.as_deref());
        let version = negotiate_protocol_version(requested);

        if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
            tracing::info!(
                client = %client.name,
                client_version = %client.version,
                protocol = version,
                "Initializing MCP session"
            );
        }

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: self.server_info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        to_response(id, &result)
    }

    /// Execute one call. Tool failures become `isError` results; a task
    /// that dies still gets an error response.
    async fn run_tool_call(self: Arc<Self>, id: Value, params: CallToolParams) -> JsonRpcResponse {
        let call_id = match &id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let context = ToolExecutionContext::new(call_id)
            .with_working_directory(self.working_directory.clone());

        let registry = self.registry.clone();
        let handle = tokio::spawn(async move {
            let arguments = params
                .arguments
                .unwrap_or_else(|| Value::Object(Default::default()));
            match registry.execute(&params.name, arguments, &context).await {
                Ok(result) => CallToolResult::from(result),
                Err(ToolError::NotFound(name)) => {
                    CallToolResult::error(format!("Unknown tool: {}", name))
                }
                Err(e) => CallToolResult::error(e.to_string()),
            }
        });

        match handle.await {
            Ok(result) => to_response(id, &result),
            Err(e) => {
                tracing::error!("Tool task failed: {}", e);
                JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Tool task failed: {}", e))
            }
        }
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Serialization failed: {}", e)),
    }
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
