//! Simple MCP Server Library
//!
//! A small Model Context Protocol style tool server: tools are registered
//! with a self-describing input schema, discovered at runtime and invoked
//! over line-delimited JSON on stdio or JSON over HTTP.

pub mod builtin;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod transport;

pub use client::McpClient;
pub use config::Config;
pub use error::{McpServerError, Result};
pub use mcp::server::Dispatcher;
pub use mcp::tools::{ToolDescriptor, ToolHandler, ToolRegistry};
