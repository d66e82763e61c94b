//! MCP (Model Context Protocol) module
//!
//! Tool registry, schema inference, wire types and the request dispatcher.

pub mod schema;
pub mod server;
pub mod tools;
pub mod types;
