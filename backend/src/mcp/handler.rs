//! MCP JSON-RPC request handler.
//!
//! Handles MCP protocol methods and routes tool calls to the dispatcher.

use brygga_types::jsonrpc::{INVALID_PARAMS, METHOD_NOT_FOUND};
use brygga_types::{JsonRpcRequest, JsonRpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::tools::ToolDispatcher;

/// MCP protocol version we answer with when the client asks for one we don't know.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol versions we accept from clients.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26"];

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "brygga";

/// Tool call parameters from MCP.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Initialize parameters; only the version matters to us.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

/// MCP request handler.
#[derive(Clone)]
pub struct McpHandler {
    dispatcher: Arc<ToolDispatcher>,
}

impl McpHandler {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Handle an MCP JSON-RPC request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        debug!("MCP: Handling method: {}", request.method);

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(id, request.params),
            // Notifications, no response needed
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                return None;
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        if request.id.is_none() {
            // A notification for a method we answer anyway; drop the reply.
            debug!("MCP: Dropping response to notification {}", request.method);
            return None;
        }
        Some(response)
    }

    /// Handle the initialize request.
    fn handle_initialize(id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        let version = params
            .protocol_version
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| PROTOCOL_VERSION.to_string());
        info!("MCP: Initializing session (protocol {})", version);

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle the tools/list request.
    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.dispatcher.list() }))
    }

    /// Handle a tools/call request.
    ///
    /// Tool failures are results with `isError` set, not JSON-RPC errors; only
    /// params without a tool name are rejected at the protocol level.
    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params.unwrap_or(json!({}))) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                );
            }
        };

        let result = self.dispatcher.call(&params.name, params.arguments).await;
        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(
                id,
                brygga_types::jsonrpc::INTERNAL_ERROR,
                format!("Failed to serialize tool result: {}", e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brygga_types::CallToolResult;

    fn handler() -> McpHandler {
        McpHandler::new(Arc::new(ToolDispatcher::with_builtin_tools()))
    }

    async fn call(method: &str, params: Value) -> JsonRpcResponse {
        handler()
            .handle_request(JsonRpcRequest::new(1, method, Some(params)))
            .await
            .unwrap()
    }

    fn tool_result(response: JsonRpcResponse) -> CallToolResult {
        serde_json::from_value(response.result.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let response = call("initialize", json!({"protocolVersion": "2025-03-26"})).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);

        let response = call("initialize", json!({"protocolVersion": "1999-01-01"})).await;
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let handler = handler();
        let note = JsonRpcRequest::notification("notifications/initialized", None);
        assert!(handler.handle_request(note).await.is_none());
        let note = JsonRpcRequest::notification("ping", None);
        assert!(handler.handle_request(note).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = call("tools/list", json!({})).await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        let echo = tools.iter().find(|t| t["name"] == "echo").unwrap();
        assert_eq!(echo["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_tools_call_echo() {
        let response = call(
            "tools/call",
            json!({"name": "echo", "arguments": {"text": "hi"}}),
        )
        .await;
        let result = tool_result(response);
        assert!(!result.is_error);
        assert_eq!(result.content[0].as_text(), Some("echo: hi"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result_not_rpc_error() {
        let response = call("tools/call", json!({"name": "doesNotExist"})).await;
        assert!(response.error.is_none());
        let result = tool_result(response);
        assert!(result.is_error);
        assert!(result.content[0].as_text().unwrap().contains("doesNotExist"));
    }

    #[tokio::test]
    async fn test_missing_tool_name_is_invalid_params() {
        let response = call("tools/call", json!({"arguments": {}})).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = call("resources/list", json!({})).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
