//! Stdio transport
//!
//! Line-delimited JSON: one request object per input line, one response
//! object per output line. Requests on a connection are handled strictly in
//! order; the next line is not read before the previous response is flushed.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{debug, info, warn};

use crate::error::{McpError, TransportError};
use crate::mcp::server::Dispatcher;
use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse, RequestId};

/// Line-framed transport over any buffered reader / writer pair
pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
}

impl StdioTransport<BufReader<Stdin>, Stdout> {
    /// Transport bound to the process' stdin and stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Serve requests until the input reaches end-of-stream.
    ///
    /// Only I/O failures on the underlying streams end the loop with an error.
    pub async fn serve(&mut self, dispatcher: &Dispatcher) -> Result<(), TransportError> {
        info!("Ready - communicating via stdin/stdout");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = self.reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                info!("Input closed, shutting down");
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    debug!(message = %line.trim(), "Received message");
                    match decode_request(line.trim()) {
                        Ok(request) => dispatcher.handle_request(request).await,
                        Err(response) => Some(response),
                    }
                }
                Err(e) => Some(parse_error(None, e.to_string())),
            };

            if let Some(response) = response {
                self.write_response(&response).await?;
            }
        }

        Ok(())
    }

    async fn write_response(&mut self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        let mut frame = serde_json::to_vec(response)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Serve the dispatcher on the process' stdin/stdout
pub async fn run_stdio(dispatcher: &Dispatcher) -> Result<(), TransportError> {
    StdioTransport::stdio().serve(dispatcher).await
}

/// Decode one line into a request, or into the parse-error response to send back.
///
/// When the line is valid JSON carrying an `id`, the error echoes that id.
pub fn decode_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let raw: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Failed to parse JSON");
        parse_error(None, e.to_string())
    })?;

    let id = raw
        .get("id")
        .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

    serde_json::from_value(raw).map_err(|e| {
        warn!(error = %e, "Failed to decode request");
        parse_error(id, e.to_string())
    })
}

fn parse_error(id: Option<RequestId>, message: String) -> JsonRpcResponse {
    JsonRpcResponse::error(id, McpError::Parse { message }.to_rpc_error())
}
