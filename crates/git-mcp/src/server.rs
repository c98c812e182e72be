//! MCP server
//!
//! Reads JSON-RPC messages line by line, answers `initialize` and
//! `tools/list` itself and hands every `tools/call` to the [`Dispatcher`].

use std::io::{BufRead, Write};

use serde_json::{Value, json};

use crate::config::ServerConfig;
use crate::dispatch::{DispatchRequest, DispatchResponse, Dispatcher};
use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolsCapability,
};
use crate::tools::{ToolDefinition, ToolResult, operation_name, tool_definitions};
use crate::Result;

/// MCP server exposing git operations as tools.
///
/// # Example
///
/// ```ignore
/// use git_mcp::{GitMcpServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut server = GitMcpServer::new(&ServerConfig::default());
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct GitMcpServer {
    dispatcher: Dispatcher,
    tools: Vec<ToolDefinition>,
    initialized: bool,
}

impl GitMcpServer {
    pub fn new(config: &ServerConfig) -> Self {
        let dispatcher = Dispatcher::new(config);
        let tools = tool_definitions(dispatcher.registry(), config.repository.is_none());
        Self {
            dispatcher,
            tools,
            initialized: false,
        }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        tracing::info!(tools = self.tools.len(), "MCP server ready, listening on stdio");
        self.serve(stdin.lock(), stdout.lock()).await
    }

    /// Serve line-delimited messages from `input`, writing replies to `output`.
    pub async fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            tracing::debug!(request = %line, "Received message");

            let reply = match self.handle_message(&line).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to handle message");
                    let message = format!("Internal error: {e}");
                    let response = JsonRpcResponse::error(None, INTERNAL_ERROR, message);
                    Some(serde_json::to_string(&response)?)
                }
            };

            if let Some(reply) = reply {
                writeln!(output, "{reply}")?;
                output.flush()?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` means no reply is due (notifications).
    pub async fn handle_message(&mut self, message: &str) -> Result<Option<String>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                let message = format!("Parse error: {e}");
                let response = JsonRpcResponse::error(None, PARSE_ERROR, message);
                return Ok(Some(serde_json::to_string(&response)?));
            }
        };

        if request.jsonrpc != "2.0" {
            let response = JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version '{}'", request.jsonrpc),
            );
            return Ok(Some(serde_json::to_string(&response)?));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id)?,
            "initialized" | "notifications/initialized" => return Ok(None),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await?,
            _ if request.is_notification() => return Ok(None),
            method => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ),
        };

        Ok(Some(serde_json::to_string(&response)?))
    }

    fn handle_initialize(&mut self, id: Option<Value>) -> Result<JsonRpcResponse> {
        self.initialized = true;
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "git-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                ));
            }
        };

        let operation = operation_name(&params.name);
        let response = match DispatchRequest::from_tool_call(operation, params.arguments) {
            Ok(request) => self.dispatcher.dispatch(request).await,
            Err(e) => DispatchResponse::Failure(e),
        };

        let tool_result = ToolResult::from_response(&response)?;
        Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> GitMcpServer {
        GitMcpServer::new(&ServerConfig::default())
    }

    async fn reply(server: &mut GitMcpServer, message: &str) -> Value {
        let text = server.handle_message(message).await.unwrap().unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn initialize_marks_server_ready() {
        let mut server = server();
        assert!(!server.is_initialized());

        let response = reply(
            &mut server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await;

        assert!(server.is_initialized());
        assert_eq!(response["result"]["serverInfo"]["name"], "git-mcp");
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let mut server = server();
        for message in [
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{}}"#,
        ] {
            assert!(server.handle_message(message).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn lists_generated_tools() {
        let mut server = server();
        let response = reply(&mut server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 15);
        assert_eq!(tools[0]["name"], "git_status");
        assert!(tools[0]["inputSchema"]["properties"]["repo_path"].is_object());
    }

    #[tokio::test]
    async fn parse_error_code() {
        let mut server = server();
        let response = reply(&mut server, r#"{"invalid json"#).await;
        assert_eq!(response["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn unknown_method_code() {
        let mut server = server();
        let response =
            reply(&mut server, r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#).await;
        assert_eq!(response["id"], 4);
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_tool_error() {
        let mut server = server();
        let response = reply(
            &mut server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"git_rebase","arguments":{"repo_path":"/tmp"}}}"#,
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("UnknownOperationError"), "{text}");
    }

    #[tokio::test]
    async fn malformed_call_params() {
        let mut server = server();
        let response = reply(
            &mut server,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn serve_writes_one_line_per_reply() {
        let mut server = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""id":1"#));
        assert!(lines[1].contains(r#""id":2"#));
    }
}
