//! Tool server client
//!
//! Connects to a tool server over either transport, caches the discovered
//! tool descriptors and forwards calls. Errors mirror the server taxonomy
//! instead of exposing transport-specific status codes.

use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::mcp::tools::ToolDescriptor;
use crate::mcp::types::*;

const CLIENT_NAME: &str = "simple-mcp-client";

/// How long `disconnect` waits for the server to exit after stdin closes
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Where the server lives
#[derive(Debug, Clone)]
enum Endpoint {
    /// Child process speaking line-delimited JSON on stdin/stdout
    Stdio { program: String, args: Vec<String> },
    /// HTTP server exposing `/tools` and `/tools/call`
    Http { base_url: String },
}

/// Live transport state
enum Connection {
    Stdio {
        child: Child,
        stdin: ChildStdin,
        stdout: BufReader<ChildStdout>,
        /// Bytes of a response line read so far; survives a cancelled call
        line: Vec<u8>,
        /// Set while a request frame is being written
        writing: bool,
    },
    Http {
        client: reqwest::Client,
    },
}

/// Client for a remote tool server
pub struct McpClient {
    endpoint: Endpoint,
    connection: Option<Connection>,
    tools: Vec<ToolDescriptor>,
    next_id: i64,
}

impl McpClient {
    /// A client that will spawn `program` and talk to it over its stdio
    pub fn stdio(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_endpoint(Endpoint::Stdio {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// A client for an HTTP server rooted at `base_url`
    pub fn http(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self::with_endpoint(Endpoint::Http {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connection: None,
            tools: Vec::new(),
            next_id: 1,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Tools discovered by the last successful `connect`
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Establish the transport and run discovery.
    ///
    /// Connecting an already connected client is a no-op.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }

        let result = match self.endpoint.clone() {
            Endpoint::Stdio { program, args } => self.connect_stdio(&program, &args).await,
            Endpoint::Http { base_url } => self.connect_http(&base_url).await,
        };

        match result {
            Ok(tools) => {
                info!(count = tools.len(), "Tool discovery complete");
                self.tools = tools;
                Ok(())
            }
            Err(err) => {
                self.disconnect().await;
                Err(match err {
                    ClientError::Connection { .. } => err,
                    other => ClientError::connection(other.to_string()),
                })
            }
        }
    }

    async fn connect_stdio(
        &mut self,
        program: &str,
        args: &[String],
    ) -> Result<Vec<ToolDescriptor>, ClientError> {
        info!(program = %program, "Spawning tool server process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClientError::connection(format!("failed to spawn '{}': {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::connection("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::connection("failed to capture server stdout"))?;

        self.connection = Some(Connection::Stdio {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: Vec::new(),
            writing: false,
        });

        let init = self
            .request_stdio(
                methods::INITIALIZE,
                Some(json!({
                    "protocolVersion": MCP_VERSION,
                    "clientInfo": {
                        "name": CLIENT_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                })),
            )
            .await?;
        if let Some(err) = init.error {
            return Err(ClientError::connection(err.message));
        }

        let listing = self.request_stdio(methods::LIST_TOOLS, None).await?;
        if let Some(err) = listing.error {
            return Err(ClientError::connection(err.message));
        }
        let result: ListToolsResult = serde_json::from_value(listing.result.unwrap_or_default())
            .map_err(|e| ClientError::connection(format!("invalid tool listing: {}", e)))?;

        Ok(result.tools.into_iter().map(Tool::into_descriptor).collect())
    }

    async fn connect_http(&mut self, base_url: &str) -> Result<Vec<ToolDescriptor>, ClientError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::connection(format!("failed to build HTTP client: {}", e)))?;

        let health = client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .map_err(|e| ClientError::connection(format!("server unreachable: {}", e)))?;
        if !health.status().is_success() {
            return Err(ClientError::connection(format!(
                "health check failed with status {}",
                health.status()
            )));
        }

        let listing: ListToolsResult = client
            .get(format!("{}/tools", base_url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClientError::connection(format!("discovery failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ClientError::connection(format!("invalid tool listing: {}", e)))?;

        info!(url = %base_url, "Connected to HTTP tool server");
        self.connection = Some(Connection::Http { client });

        Ok(listing.tools.into_iter().map(Tool::into_descriptor).collect())
    }

    /// Invoke a tool and return its rendered result
    pub async fn call(&mut self, name: &str, args: Value) -> Result<String, ClientError> {
        let http_client = match &self.connection {
            None => return Err(ClientError::NotConnected),
            Some(Connection::Stdio { .. }) => None,
            Some(Connection::Http { client }) => Some(client.clone()),
        };

        match http_client {
            Some(client) => self.call_http(&client, name, args).await,
            None => self.call_stdio(name, args).await,
        }
    }

    async fn call_stdio(&mut self, name: &str, args: Value) -> Result<String, ClientError> {
        let response = self
            .request_stdio(
                methods::CALL_TOOL,
                Some(json!({ "name": name, "arguments": args })),
            )
            .await?;

        if let Some(err) = response.error {
            return Err(match err.error_code() {
                Some(ErrorCode::ToolNotFound) => ClientError::ToolNotFound {
                    message: err.message,
                },
                Some(ErrorCode::ToolExecutionError) | Some(ErrorCode::InvalidParams) => {
                    ClientError::ToolExecution {
                        message: err.message,
                    }
                }
                _ => ClientError::transport(err.message),
            });
        }

        let result: CallToolResult = response
            .result
            .ok_or_else(|| ClientError::transport("response carries neither result nor error"))
            .and_then(|r| {
                serde_json::from_value(r)
                    .map_err(|e| ClientError::transport(format!("invalid call result: {}", e)))
            })?;

        Ok(result.into_text())
    }

    async fn call_http(
        &self,
        client: &reqwest::Client,
        name: &str,
        args: Value,
    ) -> Result<String, ClientError> {
        let Endpoint::Http { base_url } = &self.endpoint else {
            return Err(ClientError::NotConnected);
        };

        let response = client
            .post(format!("{}/tools/call", base_url))
            .json(&HttpCallRequest {
                tool: name.to_string(),
                args,
            })
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: HttpCallResponse = response
                .json()
                .await
                .map_err(|e| ClientError::transport(format!("invalid call result: {}", e)))?;
            return Ok(body.result);
        }

        let detail = match response.json::<HttpErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status.to_string(),
        };

        Err(match status {
            reqwest::StatusCode::NOT_FOUND => ClientError::ToolNotFound { message: detail },
            reqwest::StatusCode::BAD_REQUEST => ClientError::ToolExecution { message: detail },
            _ => ClientError::transport(format!("HTTP {}: {}", status, detail)),
        })
    }

    /// Send one request over the child's stdin and wait for its response.
    ///
    /// Any transport failure leaves the pipe in an unknown state, so the
    /// connection is dropped and later calls see `NotConnected`.
    async fn request_stdio(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let Some(Connection::Stdio {
            stdin,
            stdout,
            line,
            writing,
            ..
        }) = self.connection.as_mut()
        else {
            return Err(ClientError::NotConnected);
        };

        let request = JsonRpcRequest::new(RequestId::Number(id), method, params);
        let mut frame =
            serde_json::to_vec(&request).map_err(|e| ClientError::transport(e.to_string()))?;
        frame.push(b'\n');

        debug!(method = %method, id = id, "Sending request");

        let result = exchange(stdin, stdout, line, writing, id, &frame).await;
        if let Err(err) = &result {
            warn!(error = %err, "Tool server connection lost");
            self.disconnect().await;
        }
        result
    }

    /// Release the transport. Calling it while disconnected does nothing.
    ///
    /// A stdio server is asked to stop by closing its stdin and is killed
    /// only if it has not exited within the grace period.
    pub async fn disconnect(&mut self) {
        match self.connection.take() {
            Some(Connection::Stdio {
                mut child, stdin, ..
            }) => {
                drop(stdin);
                match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                    Ok(Ok(status)) => info!(%status, "Tool server process exited"),
                    Ok(Err(e)) => {
                        warn!(error = %e, "Failed to wait for tool server process");
                        kill(&mut child).await;
                    }
                    Err(_) => {
                        warn!("Tool server did not exit after stdin closed, killing it");
                        kill(&mut child).await;
                    }
                }
            }
            Some(Connection::Http { .. }) => {
                info!("HTTP client closed");
            }
            None => {}
        }
        self.tools.clear();
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to stop tool server process");
    }
}

/// Write one request frame and read lines until the matching response.
///
/// Responses to earlier ids belong to calls that were cancelled after their
/// request went out; they are skipped. Partial lines stay in `line` so a
/// cancelled read resumes where it stopped.
async fn exchange(
    stdin: &mut ChildStdin,
    stdout: &mut BufReader<ChildStdout>,
    line: &mut Vec<u8>,
    writing: &mut bool,
    id: i64,
    frame: &[u8],
) -> Result<JsonRpcResponse, ClientError> {
    if *writing {
        return Err(ClientError::transport(
            "a previous request was interrupted while being written",
        ));
    }

    *writing = true;
    stdin
        .write_all(frame)
        .await
        .map_err(|e| ClientError::transport(format!("failed to write request: {}", e)))?;
    stdin
        .flush()
        .await
        .map_err(|e| ClientError::transport(format!("failed to write request: {}", e)))?;
    *writing = false;

    loop {
        let read = stdout
            .read_until(b'\n', line)
            .await
            .map_err(|e| ClientError::transport(format!("failed to read response: {}", e)))?;
        if read == 0 {
            return Err(ClientError::transport("server closed the connection"));
        }
        if !line.ends_with(b"\n") {
            continue;
        }

        let received = std::mem::take(line);
        if received.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let response: JsonRpcResponse = serde_json::from_slice(&received)
            .map_err(|e| ClientError::transport(format!("invalid response: {}", e)))?;

        match response.id {
            Some(RequestId::Number(n)) if n == id => return Ok(response),
            Some(RequestId::Number(n)) if n < id => {
                debug!(stale = n, awaiting = id, "Discarding response to a cancelled call");
            }
            ref other => {
                return Err(ClientError::transport(format!(
                    "response id {:?} does not match request id {}",
                    other, id
                )))
            }
        }
    }
}
