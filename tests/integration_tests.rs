//! Integration tests for the Simple MCP Server
//!
//! These tests drive the built binary over its stdio protocol, exercise the
//! HTTP router in-process and run the client against both transports.

use std::process::Stdio;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_test::{assert_err, assert_ok};

use simple_mcp_server_rust::error::{ClientError, ToolError};
use simple_mcp_server_rust::mcp::schema::{InputSchema, ParamDecl, ParamType};
use simple_mcp_server_rust::mcp::types::Arguments;
use simple_mcp_server_rust::{Dispatcher, McpClient, ToolRegistry};

const SERVER_BIN: &str = env!("CARGO_BIN_EXE_simple-mcp-server");

/// Helper to create a JSON-RPC request line
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    format!("{}\n", request)
}

/// Registry with exactly `add` and `uppercase`, declared by explicit parameter lists
fn scenario_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register_fn(
            "add",
            "Add two numbers",
            InputSchema::infer(&[
                ParamDecl::typed("a", ParamType::Number),
                ParamDecl::typed("b", ParamType::Number),
            ]),
            |args: Arguments| async move {
                match (args["a"].as_f64(), args["b"].as_f64()) {
                    (Some(a), Some(b)) => Ok(json!(a + b)),
                    _ => Err(ToolError::execution("a and b must be numbers")),
                }
            },
        )
        .unwrap();
    registry
        .register_fn(
            "uppercase",
            "Convert text to uppercase",
            InputSchema::infer(&[ParamDecl::typed("text", ParamType::String)]),
            |args: Arguments| async move {
                Ok(json!(args["text"].as_str().unwrap_or_default().to_uppercase()))
            },
        )
        .unwrap();
    registry
}

mod stdio_protocol_tests {
    use super::*;

    /// Write `input` to a fresh server process, close stdin and collect every response line
    async fn exchange(input: &str) -> Vec<Value> {
        let mut child = Command::new(SERVER_BIN)
            .arg("stdio")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn server");

        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(input.as_bytes()).await.unwrap();
        drop(stdin);

        let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str(&line).expect("response is not JSON"));
        }

        let status = child.wait().await.unwrap();
        assert!(status.success(), "server exited with {}", status);
        responses
    }

    #[tokio::test]
    async fn test_ids_echoed_in_order() {
        let input = make_request(
            1,
            "call_tool",
            Some(json!({"name": "add", "arguments": {"a": 2, "b": 3}})),
        ) + &make_request(
            2,
            "call_tool",
            Some(json!({"name": "uppercase", "arguments": {"text": "hi"}})),
        );

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["content"][0]["text"], "5");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "HI");
    }

    #[tokio::test]
    async fn test_malformed_line_then_valid_request() {
        let input = "this is not json\n".to_string() + &make_request(3, "tools/list", None);

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 2);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 3);
        assert_eq!(responses[1]["result"]["tools"][0]["name"], "add");
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_server() {
        let input = make_request(1, "call_tool", Some(json!({"name": "missing", "arguments": {}})))
            + &make_request(2, "call_tool", Some(json!({"name": "add", "arguments": {"a": 1}})))
            + &make_request(3, "resources/list", None)
            + &make_request(4, "call_tool", Some(json!({"name": "add", "arguments": {"a": 1, "b": 1}})));

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["error"]["code"], -32601);
        assert_eq!(responses[0]["error"]["data"]["kind"], "tool_not_found");
        assert_eq!(responses[1]["error"]["code"], -32603);
        assert_eq!(responses[2]["error"]["data"]["kind"], "method_not_found");
        assert_eq!(responses[3]["result"]["content"][0]["text"], "2");
    }

    #[tokio::test]
    async fn test_opaque_id_and_notification_with_id() {
        let input = concat!(
            r#"{"id":1.5,"method":"list_tools"}"#,
            "\n",
            r#"{"id":9,"method":"notifications/cancelled"}"#,
            "\n",
            r#"{"method":"notifications/initialized"}"#,
            "\n",
            r#"{"id":10,"method":"ping"}"#,
            "\n",
        );

        let responses = exchange(input).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], json!(1.5));
        assert_eq!(responses[0]["result"]["tools"][0]["name"], "add");
        assert_eq!(responses[1]["id"], 9);
        assert_eq!(responses[2]["id"], 10);
    }

    #[tokio::test]
    async fn test_initialize() {
        let responses = exchange(&make_request(1, "initialize", Some(json!({})))).await;
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "simple-mcp-server");
        assert!(responses[0]["result"]["capabilities"]["tools"].is_object());
    }
}

mod dispatcher_tests {
    use super::*;

    #[tokio::test]
    async fn test_scenario_listing() {
        let dispatcher = Dispatcher::new(Arc::new(scenario_registry()));
        let listing = dispatcher.list_tools();

        let names: Vec<&str> = listing.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["add", "uppercase"]);

        let add_params: Vec<&String> = listing.tools[0].input_schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(add_params, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_scenario_calls() {
        let dispatcher = Dispatcher::new(Arc::new(scenario_registry()));
        assert_eq!(
            dispatcher.call_tool("add", json!({"a": 2, "b": 3})).await.unwrap(),
            "5"
        );
        assert_eq!(
            dispatcher
                .call_tool("uppercase", json!({"text": "hi"}))
                .await
                .unwrap(),
            "HI"
        );
    }
}

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_stdio_client_round_trip() {
        let mut client = McpClient::stdio(SERVER_BIN, ["stdio"]);
        assert_ok!(client.connect().await);
        assert!(client.is_connected());

        let names: Vec<&str> = client.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["add", "multiply", "get_current_time", "uppercase", "count_words"]
        );
        let required: Vec<bool> = client
            .tool("add")
            .unwrap()
            .input_schema
            .params()
            .iter()
            .map(|p| p.required)
            .collect();
        assert_eq!(required, vec![true, true]);

        assert_eq!(client.call("add", json!({"a": 2, "b": 3})).await.unwrap(), "5");
        assert_eq!(
            client.call("count_words", json!({"text": "a b c"})).await.unwrap(),
            "3"
        );

        let missing = assert_err!(client.call("missing", json!({})).await);
        assert!(matches!(missing, ClientError::ToolNotFound { .. }));

        let bad = assert_err!(client.call("add", json!({"a": 1})).await);
        assert!(matches!(bad, ClientError::ToolExecution { .. }));

        // still usable after failures
        assert_eq!(
            client.call("uppercase", json!({"text": "ok"})).await.unwrap(),
            "OK"
        );

        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected());
        assert!(matches!(
            client.call("add", json!({"a": 1, "b": 1})).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_stdio_client_survives_cancelled_call() {
        let mut client = McpClient::stdio(SERVER_BIN, ["stdio"]);
        assert_ok!(client.connect().await);

        // outcome depends on timing; either way the next calls must line up
        let _ = tokio::time::timeout(
            std::time::Duration::ZERO,
            client.call("add", json!({"a": 2, "b": 3})),
        )
        .await;

        for text in ["one", "two", "three"] {
            assert_eq!(
                client.call("uppercase", json!({"text": text})).await.unwrap(),
                text.to_uppercase()
            );
        }
        assert!(client.is_connected());
        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_http_client_against_scenario_registry() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(scenario_registry())));
        tokio::spawn(simple_mcp_server_rust::transport::http::serve(listener, dispatcher));

        let mut client = McpClient::http(format!("http://{}", addr));
        assert_ok!(client.connect().await);
        assert_eq!(client.tools().len(), 2);

        assert_eq!(client.call("add", json!({"a": 1.5, "b": 1})).await.unwrap(), "2.5");
        let err = assert_err!(client.call("missing", json!({})).await);
        assert!(matches!(err, ClientError::ToolNotFound { .. }));

        client.disconnect().await;
    }
}
