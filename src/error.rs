//! Error types for the MCP tool server
//!
//! This module defines the error hierarchy for registry, protocol, transport
//! and client operations.

use thiserror::Error;

use crate::mcp::types::{ErrorCode, JsonRpcError};

/// Main error type for the MCP tool server
#[derive(Error, Debug)]
pub enum McpServerError {
    /// Tool registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Client errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tool registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },
}

/// Errors raised while validating arguments for, or running, a tool handler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("unexpected argument: {name}")]
    UnexpectedArgument { name: String },

    #[error("argument '{name}' must be a {expected}, got {found}")]
    InvalidArgument {
        name: String,
        expected: String,
        found: String,
    },

    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("{message}")]
    Execution { message: String },

    #[error("tool handler panicked")]
    Panicked,
}

impl ToolError {
    /// Create an execution error from any displayable failure
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

/// MCP protocol errors, each carrying a stable wire code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Tool execution failed: {message}")]
    ToolExecution { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl McpError {
    /// Protocol error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            McpError::Parse { .. } => ErrorCode::ParseError,
            McpError::MethodNotFound { .. } => ErrorCode::MethodNotFound,
            McpError::ToolNotFound { .. } => ErrorCode::ToolNotFound,
            McpError::InvalidParams { .. } => ErrorCode::InvalidParams,
            McpError::ToolExecution { .. } => ErrorCode::ToolExecutionError,
            McpError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Convert into the JSON-RPC error object written to the wire
    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string())
    }
}

impl From<RegistryError> for McpError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ToolNotFound { name } => McpError::ToolNotFound { name },
            other => McpError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        McpError::ToolExecution {
            message: err.to_string(),
        }
    }
}

/// Client-side errors, mirroring the server taxonomy
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Unknown tool: {message}")]
    ToolNotFound { message: String },

    #[error("Tool execution failed: {message}")]
    ToolExecution { message: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Client is not connected")]
    NotConnected,
}

impl ClientError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Transport errors (fatal for the serving loop)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },
}

/// Result type alias for MCP server operations
pub type Result<T> = std::result::Result<T, McpServerError>;
