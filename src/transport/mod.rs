//! Transport bindings for the tool protocol
//!
//! - `stdio`: line-delimited JSON over a process pipe
//! - `http`: JSON request/response over HTTP

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::{run_stdio, StdioTransport};
