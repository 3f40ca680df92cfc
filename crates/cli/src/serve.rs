//! Server mode – the tool registry as an MCP server, over stdio or streamable
//! HTTP at `/mcp`.

use anyhow::Context;
use bsl_adapter::{AdapterContext, CancelSignal, ToolDescriptor, ToolRegistry};
use rmcp::model::{
    self, CallToolRequestParam, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SERVER_NAME: &str = "mcp-1c-bsl";
pub const MCP_ENDPOINT: &str = "/mcp";

const INSTRUCTIONS: &str = "Static analysis and formatting of 1C:Enterprise (BSL) and OneScript \
    code with BSL Language Server. Use bsl_analyze for diagnostics and metrics, bsl_format to \
    format files in place.";

/// MCP handler in front of the tool registry. Cheap to clone: one instance per
/// HTTP session.
#[derive(Clone)]
pub struct BslServer {
    ctx: AdapterContext,
    registry: Arc<ToolRegistry>,
}

impl BslServer {
    pub fn new(ctx: AdapterContext, registry: ToolRegistry) -> Self {
        Self {
            ctx,
            registry: Arc::new(registry),
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry.descriptors().into_iter().map(to_mcp_tool).collect()
    }

    /// Run a tool; failures come back as `isError` results, never as protocol errors.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> model::CallToolResult {
        let args = arguments.map(Value::Object).unwrap_or(Value::Null);
        let result = self.registry.execute(name, args, &self.ctx).await;
        let content = vec![Content::text(result.text())];
        if result.is_error {
            model::CallToolResult::error(content)
        } else {
            model::CallToolResult::success(content)
        }
    }
}

fn to_mcp_tool(d: ToolDescriptor) -> Tool {
    let schema = match d.input_schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    Tool::new(d.name, d.description, Arc::new(schema))
}

impl ServerHandler for BslServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<model::CallToolResult, McpError> {
        Ok(self.call(&request.name, request.arguments).await)
    }
}

pub async fn run_stdio(server: BslServer, cancel: CancelSignal) -> anyhow::Result<()> {
    // stdout carries MCP frames; logs stay on stderr.
    let running = server
        .serve(stdio())
        .await
        .context("failed to start stdio MCP server")?;
    tracing::info!("{} serving on stdio", SERVER_NAME);

    tokio::select! {
        res = running.waiting() => {
            res.context("stdio MCP server task join failed")?;
        }
        _ = cancel.cancelled() => tracing::info!("stdio transport stopped"),
    }
    Ok(())
}

pub async fn run_http(server: BslServer, port: u16, cancel: CancelSignal) -> anyhow::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service(MCP_ENDPOINT, service);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("cannot bind port {}", port))?;
    tracing::info!(
        "{} serving HTTP on http://{}{}",
        SERVER_NAME,
        listener.local_addr()?,
        MCP_ENDPOINT
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            tracing::info!("HTTP transport stopped");
        })
        .await
        .context("HTTP transport")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsl_adapter::{EngineLocation, EngineSettings};
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn server(dir: &std::path::Path) -> BslServer {
        let ctx = AdapterContext::new(
            EngineSettings::new(EngineLocation::new(dir.join("bsl-language-server.jar"))),
            CancelSignal::never(),
        );
        BslServer::new(ctx, ToolRegistry::new())
    }

    #[test]
    fn test_tools_carry_input_schema() {
        let dir = tempfile::tempdir().unwrap();
        let tools = server(dir.path()).tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "bsl_analyze");
        assert_eq!(tools[0].input_schema["required"], json!(["srcDir"]));
        assert_eq!(tools[1].name, "bsl_format");
        assert_eq!(tools[1].input_schema["required"], json!(["src"]));
    }

    #[test]
    fn test_server_info() {
        let dir = tempfile::tempdir().unwrap();
        let info = server(dir.path()).get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_missing_jar_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let args = json!({ "srcDir": "/tmp/project" }).as_object().cloned();
        let result = server(dir.path()).call("bsl_analyze", args).await;
        assert_eq!(result.is_error, Some(true));
        let text = serde_json::to_value(&result).unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.starts_with("Error:"));
        assert!(text.contains("bsl-language-server.jar"));
    }

    #[tokio::test]
    async fn test_call_without_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let result = server(dir.path()).call("bsl_format", None).await;
        assert_eq!(result.is_error, Some(true));
        let value = serde_json::to_value(&result).unwrap();
        assert!(value["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("specify src"));
    }

    /// Full JSON-RPC exchange over an in-memory pipe, the way a stdio client talks.
    #[tokio::test]
    async fn test_json_rpc_session() {
        let dir = tempfile::tempdir().unwrap();
        let s = server(dir.path());
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(async move {
            let running = s.serve(server_io).await?;
            running.waiting().await?;
            anyhow::Ok(())
        });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        let frame = |v: Value| {
            let mut line = v.to_string();
            line.push('\n');
            line
        };

        let init = frame(json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "0.0.1" }
            }
        }));
        writer.write_all(init.as_bytes()).await.unwrap();
        let resp: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);

        let initialized = frame(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
        writer.write_all(initialized.as_bytes()).await.unwrap();

        let list = frame(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }));
        writer.write_all(list.as_bytes()).await.unwrap();
        let resp: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(resp["id"], 2);
        assert_eq!(resp["result"]["tools"][0]["name"], "bsl_analyze");
        assert_eq!(resp["result"]["tools"][1]["name"], "bsl_format");

        let call = frame(json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": "bsl_analyze", "arguments": { "srcDir": " " } }
        }));
        writer.write_all(call.as_bytes()).await.unwrap();
        let resp: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(resp["id"], 3);
        assert_eq!(resp["result"]["isError"], true);
        assert!(resp["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Error: specify srcDir"));

        drop(writer);
        drop(lines);
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }

    async fn http_exchange(port: u16, request: &str) -> String {
        let mut stream = None;
        for _ in 0..50 {
            match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                Ok(c) => {
                    stream = Some(c);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
        let mut stream = stream.expect("server should accept connections");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while !String::from_utf8_lossy(&received).contains("\r\n\r\n") {
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
                .await
                .expect("response headers in time")
                .unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&received).to_lowercase()
    }

    #[tokio::test]
    async fn test_http_endpoint_accepts_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let (handle, cancel) = CancelSignal::pair();
        let task = tokio::spawn(run_http(server(dir.path()), port, cancel));

        let body = json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "0.0.1" }
            }
        })
        .to_string();
        let request = format!(
            "POST {MCP_ENDPOINT} HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: application/json\r\n\
             Accept: application/json, text/event-stream\r\n\
             Content-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let response = http_exchange(port, &request).await;
        assert!(response.starts_with("http/1.1 200"), "{response}");
        assert!(response.contains("mcp-session-id"), "{response}");

        let response =
            http_exchange(port, "GET /other HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.starts_with("http/1.1 404"), "{response}");

        handle.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }
}
