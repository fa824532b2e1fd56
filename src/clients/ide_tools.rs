//! Tool-invocation channel used to drive a running IDE (MCP `tools/call` over HTTP).

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

const RUN_CONFIGURATION_TOOL: &str = "execute_run_configuration";

/// Failures raised by the IDE tool channel.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Building the HTTP client failed.
    #[error("failed to build IDE tool client")]
    ClientBuilder {
        /// reqwest builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or its body could not be read.
    #[error("failed to call IDE tool `{tool}`")]
    Request {
        /// Tool being called.
        tool: &'static str,
        /// reqwest transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The IDE answered with a non-success HTTP status.
    #[error("IDE tool endpoint returned status {status}")]
    Status {
        /// HTTP status returned.
        status: StatusCode,
    },
    /// The response body was not a JSON-RPC message.
    #[error("IDE tool response could not be decoded")]
    Decode {
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The JSON-RPC layer reported an error.
    #[error("IDE rejected tool call ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The tool ran but reported a failure.
    #[error("IDE tool `{tool}` failed: {message}")]
    ToolFailed {
        /// Tool that failed.
        tool: &'static str,
        /// Failure text reported by the tool.
        message: String,
    },
}

/// Actions the launcher needs from an IDE.
pub trait IdeTools: Send + Sync {
    /// Execute the named run configuration for the project at `project_path`.
    fn execute_run_configuration(
        &self,
        name: &str,
        project_path: &Path,
    ) -> BoxFuture<'static, Result<(), ToolError>>;
}

/// JSON-RPC client speaking the MCP `tools/call` method over HTTP.
#[derive(Clone)]
pub struct McpToolClient {
    client: Client,
    endpoint: Arc<str>,
    tool_timeout: Duration,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<ToolResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolResult {
    #[serde(default, rename = "isError")]
    is_error: bool,
    #[serde(default)]
    content: Vec<Value>,
}

impl McpToolClient {
    /// Build a client posting to `endpoint`. `tool_timeout` is both handed to the IDE and
    /// used as the HTTP request timeout.
    pub fn new(endpoint: impl Into<String>, tool_timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(tool_timeout)
            .build()
            .map_err(|source| ToolError::ClientBuilder { source })?;

        Ok(Self {
            client,
            endpoint: Arc::from(endpoint.into()),
            tool_timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    async fn call_tool(&self, tool: &'static str, arguments: Value) -> Result<(), ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments },
        });

        let response = match self
            .client
            .post(self.endpoint.as_ref())
            .header(
                reqwest::header::ACCEPT,
                "application/json, text/event-stream",
            )
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            // The IDE holds the call open while the run configuration keeps running.
            Err(err) if err.is_timeout() => {
                info!(tool, timeout = ?self.tool_timeout, "IDE tool call timed out; assuming it started");
                return Ok(());
            }
            Err(source) => return Err(ToolError::Request { tool, source }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status { status });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) if err.is_timeout() => {
                info!(tool, "IDE tool response timed out; assuming it started");
                return Ok(());
            }
            Err(source) => return Err(ToolError::Request { tool, source }),
        };

        let decoded: RpcResponse = serde_json::from_str(extract_json_payload(&body))
            .map_err(|source| ToolError::Decode { source })?;

        if let Some(error) = decoded.error {
            return Err(ToolError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        match decoded.result {
            Some(result) if result.is_error => Err(ToolError::ToolFailed {
                tool,
                message: collect_text(&result.content),
            }),
            Some(_) => Ok(()),
            None => {
                warn!(tool, "IDE tool response carried no result");
                Ok(())
            }
        }
    }
}

impl IdeTools for McpToolClient {
    fn execute_run_configuration(
        &self,
        name: &str,
        project_path: &Path,
    ) -> BoxFuture<'static, Result<(), ToolError>> {
        let client = self.clone();
        let arguments = json!({
            "configurationName": name,
            "projectPath": project_path.display().to_string(),
            "timeout": self.tool_timeout.as_millis() as u64,
        });
        Box::pin(async move { client.call_tool(RUN_CONFIGURATION_TOOL, arguments).await })
    }
}

/// Streamable HTTP servers may answer with an SSE frame; keep the last `data:` payload.
fn extract_json_payload(body: &str) -> &str {
    body.lines()
        .rev()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .unwrap_or(body)
}

fn collect_text(content: &[Value]) -> String {
    content
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    fn client_for(server: &MockServer, timeout: Duration) -> McpToolClient {
        McpToolClient::new(format!("{}/mcp", server.uri()), timeout).unwrap()
    }

    #[tokio::test]
    async fn sends_run_configuration_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": {
                    "name": "execute_run_configuration",
                    "arguments": { "configurationName": "booth-game", "projectPath": "/tmp/game" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "content": [{ "type": "text", "text": "started" }] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        client
            .execute_run_configuration("booth-game", Path::new("/tmp/game"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tool_error_result_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"isError\":true,\"content\":[{\"type\":\"text\",\"text\":\"no such configuration\"}]}}\n\n",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client
            .execute_run_configuration("missing", Path::new("/tmp/game"))
            .await
            .unwrap_err();

        match err {
            ToolError::ToolFailed { message, .. } => assert_eq!(message, "no such configuration"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rpc_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "method not found" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client
            .execute_run_configuration("booth-game", Path::new("/tmp/game"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Rpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn timeout_counts_as_started() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        client
            .execute_run_configuration("booth-game", Path::new("/tmp/game"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client
            .execute_run_configuration("booth-game", Path::new("/tmp/game"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Status { status } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }
}
