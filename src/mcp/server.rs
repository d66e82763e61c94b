//! Protocol dispatcher
//!
//! Resolves decoded requests against the immutable tool registry. The
//! dispatcher keeps no state between requests, so one instance can be shared
//! by every transport connection.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::mcp::tools::ToolRegistry;
use crate::mcp::types::*;

/// Default server name reported by `initialize`
pub const SERVER_NAME: &str = "simple-mcp-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request dispatcher for the tool protocol
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    /// Create a dispatcher over a fully built registry
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        }
    }

    /// Override the server name reported by `initialize`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_info.name = name.into();
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Handle one decoded request.
    ///
    /// Returns `None` for notifications, which get no response. A
    /// `notifications/*` method that carries an id is acknowledged with an
    /// empty result instead.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id;

        let result = match Method::parse(&request.method) {
            Some(Method::Initialize) => to_value(self.initialize()),
            Some(Method::Ping) => Ok(Value::Object(Default::default())),
            Some(Method::ListTools) => to_value(self.list_tools()),
            Some(Method::CallTool) => self.handle_call_tool(request.params).await,
            Some(Method::Notification(method)) => {
                debug!(method = %method, "Received notification");
                if id.is_none() {
                    return None;
                }
                Ok(Value::Object(Default::default()))
            }
            None => {
                warn!(method = %request.method, "Unknown method");
                Err(McpError::MethodNotFound {
                    method: request.method,
                })
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, err.to_rpc_error()),
        })
    }

    /// Static server identity
    pub fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        }
    }

    /// Wire representation of the registry, in registration order
    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.registry.list().into_iter().map(Tool::from).collect(),
        }
    }

    /// Look up and run a tool, rendering its output as a string
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, McpError> {
        let tool = self.registry.get(name)?;

        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Arguments::new(),
            other => {
                return Err(McpError::InvalidParams {
                    message: format!("arguments must be an object, got {}", other),
                })
            }
        };

        match tool.invoke(args).await {
            Ok(output) => {
                info!(tool = %name, "Tool call succeeded");
                Ok(render_result(&output))
            }
            Err(err) => {
                warn!(tool = %name, error = %err, "Tool call failed");
                Err(err.into())
            }
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| McpError::InvalidParams {
                message: format!("Invalid tool parameters: {}", e),
            })?,
            None => {
                return Err(McpError::InvalidParams {
                    message: "Missing tool parameters".to_string(),
                })
            }
        };

        let text = self.call_tool(&params.name, params.arguments).await?;
        to_value(CallToolResult::text(text))
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::Internal {
        message: e.to_string(),
    })
}

/// Largest magnitude below which every integral `f64` is exact (2^53)
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Render a handler's output for the wire.
///
/// Strings are returned as-is, everything else is compact JSON, with one
/// exception: integral floats below 2^53 in magnitude render as integers
/// (`5.0` renders as `5`, `-0.0` as `0`). Larger floats keep serde_json's
/// float form, e.g. `1e16`.
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
