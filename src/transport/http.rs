//! HTTP transport
//!
//! Exposes tool discovery and invocation as two JSON endpoints:
//! `GET /tools` and `POST /tools/call`. Requests are served concurrently;
//! they only share the read-only dispatcher.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::error::{McpError, TransportError};
use crate::mcp::server::Dispatcher;
use crate::mcp::types::{HttpCallRequest, HttpCallResponse, HttpErrorBody, ListToolsResult};

/// HTTP transport handler
pub struct HttpTransport {
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind the configured address and serve until the process stops
    pub async fn run(self, dispatcher: Arc<Dispatcher>) -> Result<(), TransportError> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                address: addr.clone(),
                source,
            })?;

        serve(listener, dispatcher).await
    }
}

/// Serve the tool endpoints on an already bound listener
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<(), TransportError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Ready - listening on {}", addr);
    }
    info!("  → Discovery:  GET /tools");
    info!("  → Invocation: POST /tools/call");

    axum::serve(listener, router(dispatcher)).await?;
    Ok(())
}

/// Build the router for the tool endpoints
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/health", get(health_check))
        .with_state(dispatcher)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tools(State(dispatcher): State<Arc<Dispatcher>>) -> Json<ListToolsResult> {
    Json(dispatcher.list_tools())
}

async fn call_tool(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let request: HttpCallRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed call body");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e));
        }
    };

    match dispatcher.call_tool(&request.tool, request.args).await {
        Ok(result) => (StatusCode::OK, Json(HttpCallResponse { result })).into_response(),
        Err(err) => error_response(status_for(&err), err.to_string()),
    }
}

/// HTTP status for a protocol error
pub fn status_for(err: &McpError) -> StatusCode {
    match err {
        McpError::ToolNotFound { .. } => StatusCode::NOT_FOUND,
        McpError::ToolExecution { .. } | McpError::InvalidParams { .. } | McpError::Parse { .. } => {
            StatusCode::BAD_REQUEST
        }
        McpError::MethodNotFound { .. } | McpError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(HttpErrorBody { detail })).into_response()
}
