//! Configuration management for the MCP tool server
//!
//! Handles environment variables and their defaults.

use crate::error::{ConfigError, Result};
use crate::mcp::server::SERVER_NAME;

/// Default HTTP bind host
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Configuration for the MCP tool server
#[derive(Debug, Clone)]
pub struct Config {
    /// Name reported by `initialize`
    pub server_name: String,

    /// HTTP transport settings
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_name = lookup("MCP_SERVER_NAME").unwrap_or_else(|| SERVER_NAME.to_string());

        let host = lookup("MCP_HTTP_HOST").unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string());

        let port = match lookup("MCP_HTTP_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnvVar {
                var: "MCP_HTTP_PORT".to_string(),
                value,
            })?,
            None => DEFAULT_HTTP_PORT,
        };

        Ok(Self {
            server_name,
            http: HttpConfig { host, port },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: SERVER_NAME.to_string(),
            http: HttpConfig::default(),
        }
    }
}
