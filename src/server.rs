//! MCP server over stdio.
//!
//! Messages are newline-delimited JSON-RPC 2.0. Requests are handled one at a
//! time in arrival order; notifications get no reply.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use smol::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::tools::{self, SqlTools, ToolError};

pub const SERVER_NAME: &str = "sqltools-mcp";
pub const SERVER_TITLE: &str = "SQLTools MCP";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC request or notification (no `id`).
#[derive(Debug, Deserialize, Clone)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response structure.
#[derive(Debug, Serialize, Clone)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Serialize, Clone)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Dispatches MCP requests to the tool handlers.
#[derive(Debug, Default)]
pub struct McpServer {
    tools: SqlTools,
}

impl McpServer {
    pub fn new(tools: SqlTools) -> Self {
        Self { tools }
    }

    pub fn tools_mut(&mut self) -> &mut SqlTools {
        &mut self.tools
    }

    /// Handle one line of input; `None` means nothing should be written back.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("unparseable message: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return id.map(|id| {
                JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\"")
            });
        }

        let outcome = self.dispatch(&request).await;
        let Some(id) = id else {
            debug!("notification {} handled", request.method);
            return None;
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    async fn dispatch(&mut self, request: &JsonRpcRequest) -> Result<Value, (i32, String)> {
        match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "notifications/initialized" | "notifications/cancelled" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(request.params.clone()).await,
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }

    fn initialize(&self) -> Value {
        info!("client initialized session");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "title": SERVER_TITLE,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn call_tool(&mut self, params: Value) -> Result<Value, (i32, String)> {
        let params: CallParams = serde_json::from_value(params)
            .map_err(|e| (INVALID_PARAMS, format!("Invalid params: {}", e)))?;

        let output = self
            .tools
            .call(&params.name, params.arguments)
            .await
            .map_err(|e: ToolError| (INVALID_PARAMS, e.to_string()))?;

        // Status has no `success` field and never signals an error.
        let is_error = output.get("success").and_then(Value::as_bool) == Some(false);
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| (INVALID_PARAMS, e.to_string()))?;

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": output,
            "isError": is_error,
        }))
    }

    /// Serve until the reader hits end of input.
    ///
    /// The connection is closed however the loop ends.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.serve_lines(reader, writer).await;
        match &result {
            Ok(()) => info!("input closed, shutting down"),
            Err(e) => warn!("stdio failed, shutting down: {}", e),
        }
        self.tools.shutdown().await;
        result
    }

    async fn serve_lines<R, W>(&mut self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    warn!("message is not valid UTF-8: {}", e);
                    Some(JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut encoded = serde_json::to_vec(&response)?;
                encoded.push(b'\n');
                writer.write_all(&encoded).await?;
                writer.flush().await?;
            }
        }
    }

    /// Serve on the process's stdin and stdout.
    pub async fn serve_stdio(&mut self) -> std::io::Result<()> {
        let stdin = smol::io::BufReader::new(smol::Unblock::new(std::io::stdin()));
        let stdout = smol::Unblock::new(std::io::stdout());
        self.serve(stdin, stdout).await
    }
}
