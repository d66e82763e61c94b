//! MCP protocol type definitions
//!
//! Wire types for the tool-invocation protocol: the JSON-RPC envelope,
//! error codes and the method-specific result payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::mcp::schema::InputSchema;
use crate::mcp::tools::ToolDescriptor;

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version
pub const MCP_VERSION: &str = "2024-11-05";

/// Tool argument mapping (argument name -> value)
pub type Arguments = Map<String, Value>;

/// JSON-RPC request
///
/// `jsonrpc` and `id` are optional on input so that bare
/// `{"method": "list_tools"}` lines are accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,

    /// Request ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Method name
    pub method: String,

    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request with the given id
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,

    /// Request ID, `null` when the request carried none or could not be decoded
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Result (on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Request ID
///
/// Ids are opaque: anything that is neither a string nor an `i64` is kept
/// as raw JSON and echoed back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Other(Value),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Protocol-level error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidParams,
    MethodNotFound,
    ToolNotFound,
    ToolExecutionError,
    InternalError,
}

impl ErrorCode {
    /// Numeric code written to the wire
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::MethodNotFound | ErrorCode::ToolNotFound => -32601,
            ErrorCode::ToolExecutionError => -32603,
            ErrorCode::InternalError => -32000,
        }
    }

    /// Value of `error.data.kind`, used to tell kinds sharing a numeric code apart
    pub fn kind(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "parse_error",
            ErrorCode::InvalidParams => "invalid_params",
            ErrorCode::MethodNotFound => "method_not_found",
            ErrorCode::ToolNotFound => "tool_not_found",
            ErrorCode::ToolExecutionError => "tool_execution_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: Some(json!({ "kind": code.kind() })),
        }
    }

    /// Recover the error kind, preferring `data.kind` over the bare code
    pub fn error_code(&self) -> Option<ErrorCode> {
        let kind = self
            .data
            .as_ref()
            .and_then(|d| d.get("kind"))
            .and_then(Value::as_str);

        match kind {
            Some("parse_error") => Some(ErrorCode::ParseError),
            Some("invalid_params") => Some(ErrorCode::InvalidParams),
            Some("method_not_found") => Some(ErrorCode::MethodNotFound),
            Some("tool_not_found") => Some(ErrorCode::ToolNotFound),
            Some("tool_execution_error") => Some(ErrorCode::ToolExecutionError),
            Some("internal_error") => Some(ErrorCode::InternalError),
            _ => match self.code {
                -32700 => Some(ErrorCode::ParseError),
                -32602 => Some(ErrorCode::InvalidParams),
                -32601 => Some(ErrorCode::MethodNotFound),
                -32603 => Some(ErrorCode::ToolExecutionError),
                -32000 => Some(ErrorCode::InternalError),
                _ => None,
            },
        }
    }
}

/// Protocol methods understood by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Ping,
    ListTools,
    CallTool,
    Notification(String),
}

impl Method {
    /// Resolve a wire method name; MCP-style aliases are accepted
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            methods::INITIALIZE => Some(Method::Initialize),
            methods::PING => Some(Method::Ping),
            methods::LIST_TOOLS | methods::LIST_TOOLS_ALIAS => Some(Method::ListTools),
            methods::CALL_TOOL | methods::CALL_TOOL_ALIAS => Some(Method::CallTool),
            other if other.starts_with(methods::NOTIFICATION_PREFIX) => {
                Some(Method::Notification(other.to_string()))
            }
            _ => None,
        }
    }
}

/// MCP server info
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,
}

/// MCP server capabilities
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Tool capabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability marker
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsCapability {}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version
    pub protocol_version: String,

    /// Server info
    pub server_info: ServerInfo,

    /// Server capabilities
    pub capabilities: ServerCapabilities,
}

/// Tool definition as written to the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Tool name
    pub name: String,

    /// Tool description
    #[serde(default)]
    pub description: String,

    /// Input schema (JSON Schema)
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl From<&ToolDescriptor> for Tool {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema.to_json_schema(),
        }
    }
}

impl Tool {
    /// Rebuild a descriptor from its wire form
    pub fn into_descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            input_schema: InputSchema::from_json_schema(&self.input_schema),
            name: self.name,
            description: self.description,
        }
    }
}

/// List tools result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Available tools
    pub tools: Vec<Tool>,
}

/// Call tool params
///
/// Both the MCP (`name`/`arguments`) and the short (`tool`/`args`) field
/// names are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name
    #[serde(alias = "tool")]
    pub name: String,

    /// Tool arguments
    #[serde(default, alias = "args")]
    pub arguments: Value,
}

/// Tool result content item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolResultContent {
    /// Text content
    #[serde(rename = "text")]
    Text { text: String },
}

/// Call tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Result content
    pub content: Vec<ToolResultContent>,
}

impl CallToolResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
        }
    }

    /// Concatenated text of all content items
    pub fn into_text(self) -> String {
        self.content
            .into_iter()
            .map(|c| match c {
                ToolResultContent::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// HTTP `POST /tools/call` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCallRequest {
    pub tool: String,

    #[serde(default)]
    pub args: Value,
}

/// HTTP `POST /tools/call` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCallResponse {
    pub result: String,
}

/// HTTP error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorBody {
    pub detail: String,
}

/// Protocol method names
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const LIST_TOOLS: &str = "list_tools";
    pub const LIST_TOOLS_ALIAS: &str = "tools/list";
    pub const CALL_TOOL: &str = "call_tool";
    pub const CALL_TOOL_ALIAS: &str = "tools/call";
    pub const NOTIFICATION_PREFIX: &str = "notifications/";
    pub const INITIALIZED: &str = "notifications/initialized";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_opaque_ids_round_trip() {
        for id in [json!(1.5), json!(true), json!(u64::MAX), json!({"k": [1]})] {
            let req: JsonRpcRequest =
                serde_json::from_value(json!({"id": id.clone(), "method": "ping"})).unwrap();
            assert_eq!(req.id, Some(RequestId::Other(id.clone())));

            let resp = JsonRpcResponse::success(req.id, json!({}));
            assert_eq!(serde_json::to_value(&resp).unwrap()["id"], id);
        }
    }

    #[test]
    fn test_null_id_is_absent() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"id":null,"method":"ping"}"#).unwrap();
        assert!(req.id.is_none());
    }

    #[test]
    fn test_bare_request_deserialize() {
        let req: JsonRpcRequest = serde_json::from_str(r#"{"method":"list_tools"}"#).unwrap();
        assert!(req.id.is_none());
        assert!(req.jsonrpc.is_none());
    }

    #[test]
    fn test_response_serialize() {
        let resp = JsonRpcResponse::success(
            Some(RequestId::Number(1)),
            serde_json::json!({"test": true}),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_error_response_keeps_null_id() {
        let resp = JsonRpcResponse::error(None, JsonRpcError::new(ErrorCode::ParseError, "bad"));
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("id").unwrap().is_null());
        assert_eq!(value["error"]["code"], -32700);
    }

    #[test]
    fn test_method_aliases() {
        assert_eq!(Method::parse("list_tools"), Some(Method::ListTools));
        assert_eq!(Method::parse("tools/list"), Some(Method::ListTools));
        assert_eq!(Method::parse("call_tool"), Some(Method::CallTool));
        assert_eq!(Method::parse("tools/call"), Some(Method::CallTool));
        assert_eq!(
            Method::parse(methods::INITIALIZED),
            Some(Method::Notification(methods::INITIALIZED.to_string()))
        );
        assert_eq!(Method::parse("resources/list"), None);
    }

    #[test]
    fn test_call_params_accept_short_names() {
        let params: CallToolParams =
            serde_json::from_str(r#"{"tool":"add","args":{"a":1}}"#).unwrap();
        assert_eq!(params.name, "add");
        assert_eq!(params.arguments["a"], 1);
    }

    #[test]
    fn test_tool_not_found_shares_code_but_not_kind() {
        let err = JsonRpcError::new(ErrorCode::ToolNotFound, "Unknown tool: x");
        assert_eq!(err.code, ErrorCode::MethodNotFound.code());
        assert_eq!(err.error_code(), Some(ErrorCode::ToolNotFound));
    }

    #[test]
    fn test_tool_result() {
        let result = CallToolResult::text("Hello");
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.into_text(), "Hello");
    }
}
