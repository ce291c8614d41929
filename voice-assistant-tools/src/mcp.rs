//! MCP tools loaded from remote servers over streamable HTTP.

use super::base::{Result, Tool, ToolError, ToolSource};
use super::registry::ToolRegistry;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MAX_TOOL_NAME_LEN: usize = 64;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const SESSION_HEADER: &str = "MCP-Session-Id";

type SharedClient = Arc<Mutex<HttpMcpClient>>;

/// Client manager holding one connection per registered MCP server
pub struct McpClientManager {
    client_name: String,
    client_version: String,
    servers: Mutex<BTreeMap<String, ServerEntry>>,
}

struct ServerEntry {
    url: String,
    connection: Option<SharedClient>,
    tools: Vec<DiscoveredTool>,
}

impl McpClientManager {
    /// Create a manager announcing itself with the given client identity
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: client_version.into(),
            servers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Names of registered servers
    pub async fn server_names(&self) -> Vec<String> {
        self.servers.lock().await.keys().cloned().collect()
    }

    /// Number of servers with an open connection
    pub async fn open_connections(&self) -> usize {
        self.servers
            .lock()
            .await
            .values()
            .filter(|entry| entry.connection.is_some())
            .count()
    }

    async fn connect(&self, url: &str) -> Result<(SharedClient, Vec<DiscoveredTool>)> {
        let mut client = HttpMcpClient::new(
            url.to_string(),
            self.client_name.clone(),
            self.client_version.clone(),
        )?;
        let tools = client.list_tools().await?;
        Ok((Arc::new(Mutex::new(client)), tools))
    }
}

#[async_trait]
impl ToolSource for McpClientManager {
    async fn add_server(&self, name: &str, url: &str) -> Result<usize> {
        if url.trim().is_empty() {
            return Err(ToolError::Connection(format!(
                "MCP server '{}' has no url",
                name
            )));
        }

        let (connection, tools) = self
            .connect(url)
            .await
            .map_err(|e| ToolError::Connection(format!("MCP server '{}': {}", name, e)))?;
        let count = tools.len();

        let previous = self.servers.lock().await.insert(
            name.to_string(),
            ServerEntry {
                url: url.to_string(),
                connection: Some(connection),
                tools,
            },
        );
        if let Some(previous) = previous.and_then(|entry| entry.connection) {
            previous.lock().await.terminate().await;
        }

        info!("MCP server '{}' registered with {} tools", name, count);
        Ok(count)
    }

    async fn tools(&self) -> ToolRegistry {
        let mut servers = self.servers.lock().await;
        let mut registry = ToolRegistry::new();

        for (name, entry) in servers.iter_mut() {
            if entry.connection.is_none() {
                match self.connect(&entry.url).await {
                    Ok((connection, tools)) => {
                        debug!("MCP server '{}' reconnected", name);
                        entry.connection = Some(connection);
                        entry.tools = tools;
                    }
                    Err(e) => {
                        warn!("MCP server '{}' skipped: {}", name, e);
                        continue;
                    }
                }
            }

            let Some(connection) = &entry.connection else {
                continue;
            };
            for tool in &entry.tools {
                let tool = McpTool::new(name, Arc::clone(connection), tool.clone());
                // Wrapped names are sanitized and truncated, so distinct tools can collide
                if registry.has(tool.name()) {
                    warn!(
                        "MCP tool '{}' from server '{}' collides with an earlier tool, skipped",
                        tool.name(),
                        name
                    );
                    continue;
                }
                registry.register(Arc::new(tool));
            }
        }

        registry
    }

    async fn close_all_connections(&self) {
        let mut servers = self.servers.lock().await;
        for (name, entry) in servers.iter_mut() {
            if let Some(connection) = entry.connection.take() {
                connection.lock().await.terminate().await;
                debug!("MCP server '{}' connection closed", name);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct DiscoveredTool {
    original_name: String,
    description: String,
    input_schema: Value,
}

struct McpTool {
    server_name: String,
    client: SharedClient,
    original_name: String,
    wrapped_name: String,
    description: String,
    parameters: Value,
}

impl McpTool {
    fn new(server_name: &str, client: SharedClient, tool: DiscoveredTool) -> Self {
        Self {
            server_name: server_name.to_string(),
            client,
            wrapped_name: wrapped_tool_name(server_name, &tool.original_name),
            original_name: tool.original_name,
            description: format!("[MCP:{}] {}", server_name, tool.description),
            parameters: tool.input_schema,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.wrapped_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        if !args.is_object() {
            return Err(ToolError::InvalidArguments(
                "MCP tool arguments must be a JSON object".to_string(),
            ));
        }

        let mut client = self.client.lock().await;
        client
            .call_tool(&self.original_name, args)
            .await
            .map_err(|e| match e {
                ToolError::ExecutionFailed(msg) => ToolError::ExecutionFailed(msg),
                other => ToolError::ExecutionFailed(format!(
                    "MCP server '{}': {}",
                    self.server_name, other
                )),
            })
    }
}

fn wrapped_tool_name(server_name: &str, tool_name: &str) -> String {
    let mut name = format!(
        "mcp_{}_{}",
        sanitize_identifier(server_name),
        sanitize_identifier(tool_name)
    );
    // Sanitized names are ASCII, so byte truncation is safe.
    name.truncate(MAX_TOOL_NAME_LEN);
    name
}

fn extract_tools_from_list_response(response: &Value) -> Result<Vec<DiscoveredTool>> {
    let tools = response
        .get("tools")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolError::Protocol("tools/list response missing 'tools' array".into()))?;

    let mut out = Vec::new();
    for item in tools {
        let original_name = item
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::Protocol("tool missing name".to_string()))?
            .to_string();
        let description = item
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&original_name)
            .to_string();
        let input_schema = item
            .get("inputSchema")
            .or_else(|| item.get("input_schema"))
            .cloned()
            .unwrap_or_else(|| json!({"type":"object","properties":{}}));

        out.push(DiscoveredTool {
            original_name,
            description,
            input_schema,
        });
    }
    Ok(out)
}

fn render_tool_result(result: &Value) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(items) = result.get("content").and_then(|v| v.as_array()) {
        for item in items {
            if item.get("type").and_then(|v| v.as_str()) == Some("text") {
                if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
                    parts.push(text.to_string());
                    continue;
                }
            }
            parts.push(item.to_string());
        }
    }

    let rendered = if parts.is_empty() {
        "(no output)".to_string()
    } else {
        parts.join("\n")
    };

    if result.get("isError").and_then(|v| v.as_bool()) == Some(true) {
        return Err(ToolError::ExecutionFailed(rendered));
    }
    Ok(rendered)
}

fn sanitize_identifier(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "tool".to_string()
    } else {
        out
    }
}

struct HttpMcpClient {
    client: reqwest::Client,
    url: String,
    client_name: String,
    client_version: String,
    session_id: Option<String>,
    protocol_version: String,
    next_id: u64,
    initialized: bool,
}

impl HttpMcpClient {
    fn new(url: String, client_name: String, client_version: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ToolError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            client_name,
            client_version,
            session_id: None,
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            next_id: 1,
            initialized: false,
        })
    }

    async fn list_tools(&mut self) -> Result<Vec<DiscoveredTool>> {
        self.ensure_initialized().await?;
        let result = self.request("tools/list", json!({})).await?;
        extract_tools_from_list_response(&result)
    }

    async fn call_tool(&mut self, tool_name: &str, arguments: Value) -> Result<String> {
        self.ensure_initialized().await?;
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": tool_name,
                    "arguments": arguments
                }),
            )
            .await?;
        render_tool_result(&result)
    }

    /// End the server-side session, best effort
    async fn terminate(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            let result = self
                .client
                .delete(&self.url)
                .header(SESSION_HEADER, session_id)
                .header("MCP-Protocol-Version", self.protocol_version.clone())
                .send()
                .await;
            if let Err(e) = result {
                debug!("MCP session termination failed for {}: {}", self.url, e);
            }
        }
        self.initialized = false;
    }

    async fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let init_result = self
            .send_request(
                "initialize",
                json!({
                    "protocolVersion": self.protocol_version,
                    "capabilities": {},
                    "clientInfo": {
                        "name": self.client_name,
                        "version": self.client_version
                    }
                }),
            )
            .await?;

        if let Some(version) = init_result
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
        {
            self.protocol_version = version.to_string();
        }

        self.notify("notifications/initialized", json!({})).await?;
        self.initialized = true;
        Ok(())
    }

    /// Send a request, re-initializing once if the server dropped our session
    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        match self.send_request(method, params.clone()).await {
            Err(SendError::SessionExpired) if self.session_id.is_some() => {
                debug!("MCP session expired for {}, re-initializing", self.url);
                self.initialized = false;
                self.session_id = None;
                self.ensure_initialized().await?;
                Ok(self.send_request(method, params).await?)
            }
            other => Ok(other?),
        }
    }

    async fn send_request(
        &mut self,
        method: &str,
        params: Value,
    ) -> std::result::Result<Value, SendError> {
        let request_id = self.take_request_id();
        let payload = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": method,
            "params": params
        });
        self.post_and_wait_for_response(&payload, request_id).await
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });

        let response = self
            .post(&payload)
            .send()
            .await
            .map_err(|e| ToolError::Connection(format!("HTTP MCP notification failed: {}", e)))?;
        self.capture_session_header(response.headers());

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ToolError::Connection(format!(
                "HTTP MCP notification returned {}",
                response.status()
            )))
        }
    }

    fn post(&self, payload: &Value) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(
                reqwest::header::ACCEPT,
                "application/json, text/event-stream",
            )
            .header("MCP-Protocol-Version", self.protocol_version.clone())
            .json(payload);

        if let Some(session_id) = &self.session_id {
            req = req.header(SESSION_HEADER, session_id);
        }
        req
    }

    async fn post_and_wait_for_response(
        &mut self,
        payload: &Value,
        request_id: u64,
    ) -> std::result::Result<Value, SendError> {
        let response = self
            .post(payload)
            .send()
            .await
            .map_err(|e| ToolError::Connection(format!("HTTP MCP request failed: {}", e)))?;

        self.capture_session_header(response.headers());

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SendError::SessionExpired);
        }
        if !response.status().is_success() {
            return Err(ToolError::Connection(format!(
                "HTTP MCP request returned {}",
                response.status()
            ))
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Connection(format!("failed to read MCP response: {}", e)))?;

        if content_type.contains("application/json") {
            let msg: Value = serde_json::from_str(&body).map_err(|e| {
                ToolError::Protocol(format!("failed to decode MCP JSON response: {}", e))
            })?;
            return Ok(extract_rpc_result(msg, request_id)?);
        }

        if content_type.contains("text/event-stream") {
            return match consume_sse_body(&body, request_id)? {
                Some(value) => Ok(value),
                None => Err(ToolError::Protocol(
                    "MCP SSE stream ended before the response arrived".to_string(),
                )
                .into()),
            };
        }

        Err(ToolError::Protocol(format!(
            "unsupported MCP HTTP response content-type: {}",
            content_type
        ))
        .into())
    }

    fn capture_session_header(&mut self, headers: &reqwest::header::HeaderMap) {
        if let Some(value) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
            if !value.trim().is_empty() {
                self.session_id = Some(value.to_string());
            }
        }
    }

    fn take_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Outcome of a single POST, separating an expired session from other failures
enum SendError {
    SessionExpired,
    Failed(ToolError),
}

impl From<ToolError> for SendError {
    fn from(e: ToolError) -> Self {
        SendError::Failed(e)
    }
}

impl From<SendError> for ToolError {
    fn from(e: SendError) -> Self {
        match e {
            SendError::SessionExpired => {
                ToolError::Connection("HTTP MCP request failed with 404".to_string())
            }
            SendError::Failed(e) => e,
        }
    }
}

#[derive(Default)]
struct SseEvent {
    data_lines: Vec<String>,
    id: Option<String>,
}

impl SseEvent {
    fn data(&self) -> String {
        self.data_lines.join("\n")
    }

    fn is_empty(&self) -> bool {
        self.data_lines.is_empty() && self.id.is_none()
    }
}

fn consume_sse_body(body: &str, request_id: u64) -> Result<Option<Value>> {
    let mut reader = BufReader::new(body.as_bytes());

    while let Some(event) = read_sse_event(&mut reader)? {
        let data = event.data();
        if data.trim().is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(&data) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if msg.get("id").and_then(|v| v.as_u64()) == Some(request_id) {
            return extract_rpc_result(msg, request_id).map(Some);
        }
    }

    Ok(None)
}

fn read_sse_event<R: BufRead>(reader: &mut R) -> Result<Option<SseEvent>> {
    let mut event = SseEvent::default();

    loop {
        let mut line = String::new();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|e| ToolError::Protocol(format!("failed to read SSE stream: {}", e)))?;

        if bytes == 0 {
            if event.is_empty() {
                return Ok(None);
            }
            return Ok(Some(event));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if event.is_empty() {
                continue;
            }
            return Ok(Some(event));
        }

        if line.starts_with(':') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            event.data_lines.push(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("id:") {
            event.id = Some(rest.trim_start().to_string());
        }
    }
}

fn extract_rpc_result(msg: Value, request_id: u64) -> Result<Value> {
    let id = msg.get("id").and_then(|v| v.as_u64());
    if id != Some(request_id) {
        return Err(ToolError::Protocol(format!(
            "received mismatched MCP response id: expected {}, got {:?}",
            request_id, id
        )));
    }

    if let Some(err) = msg.get("error") {
        return Err(ToolError::Protocol(format!("MCP request failed: {}", err)));
    }

    Ok(msg.get("result").cloned().unwrap_or_else(|| json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn rpc_result(id: u64, result: Value) -> String {
        json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
    }

    async fn mock_handshake(server: &mut mockito::ServerGuard, hits: usize) -> Vec<mockito::Mock> {
        let initialize = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "initialize"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("mcp-session-id", "session-1")
            .with_body(rpc_result(
                1,
                json!({"protocolVersion": "2024-11-05", "capabilities": {}}),
            ))
            .expect(hits)
            .create_async()
            .await;
        let initialized = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(
                json!({"method": "notifications/initialized"}),
            ))
            .match_header("mcp-session-id", "session-1")
            .with_status(202)
            .expect(hits)
            .create_async()
            .await;
        let list = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "tools/list"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_result(
                2,
                json!({"tools": [{
                    "name": "search_docs",
                    "description": "Search the docs",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"query": {"type": "string"}},
                        "required": ["query"]
                    }
                }]}),
            ))
            .expect(hits)
            .create_async()
            .await;
        vec![initialize, initialized, list]
    }

    #[test]
    fn test_read_sse_event_parses_data_and_id() {
        let input = "id: 11\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n";
        let mut reader = BufReader::new(input.as_bytes());
        let event = read_sse_event(&mut reader).unwrap().unwrap();
        assert_eq!(event.id.as_deref(), Some("11"));
        assert!(event.data().contains("\"jsonrpc\""));
    }

    #[test]
    fn test_consume_sse_body_picks_matching_id() {
        let body = concat!(
            ": keep-alive\n\n",
            "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
            "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"ok\":true}}\n\n",
        );
        let value = consume_sse_body(body, 4).unwrap().unwrap();
        assert_eq!(value["ok"], json!(true));
        assert!(consume_sse_body(": only comments\n\n", 4).unwrap().is_none());
    }

    #[test]
    fn test_extract_rpc_result() {
        let ok = extract_rpc_result(json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}}), 7)
            .unwrap();
        assert_eq!(ok["ok"], json!(true));

        let err = extract_rpc_result(
            json!({"jsonrpc": "2.0", "id": 7, "error": {"code": -32601, "message": "nope"}}),
            7,
        );
        assert!(matches!(err, Err(ToolError::Protocol(_))));

        let mismatched = extract_rpc_result(json!({"jsonrpc": "2.0", "id": 8, "result": {}}), 7);
        assert!(mismatched.is_err());
    }

    #[test]
    fn test_wrapped_tool_name() {
        assert_eq!(
            wrapped_tool_name("cloudflare-docs", "search_cloudflare_documentation"),
            "mcp_cloudflare_docs_search_cloudflare_documentation"
        );
        assert_eq!(wrapped_tool_name("Berlin Transport", ""), "mcp_berlin_transport_tool");

        let long = wrapped_tool_name("server", &"x".repeat(100));
        assert_eq!(long.len(), MAX_TOOL_NAME_LEN);
        assert!(long.starts_with("mcp_server_xxx"));
    }

    #[test]
    fn test_render_tool_result() {
        let text = render_tool_result(&json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "abc", "mimeType": "image/png"}
            ]
        }))
        .unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("first"));
        assert!(lines.next().unwrap().contains("\"image\""));

        assert_eq!(render_tool_result(&json!({})).unwrap(), "(no output)");

        let err = render_tool_result(&json!({
            "content": [{"type": "text", "text": "station unknown"}],
            "isError": true
        }))
        .unwrap_err();
        assert!(err.to_string().contains("station unknown"));
    }

    #[test]
    fn test_extract_tools_defaults() {
        let tools = extract_tools_from_list_response(&json!({
            "tools": [{"name": "ping", "description": "  "}]
        }))
        .unwrap();
        assert_eq!(tools[0].description, "ping");
        assert_eq!(tools[0].input_schema["type"], "object");

        assert!(extract_tools_from_list_response(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_add_server_lists_tools() {
        let mut server = mockito::Server::new_async().await;
        let mocks = mock_handshake(&mut server, 1).await;

        let manager = McpClientManager::new("voice-assistant", "0.1.0");
        let url = format!("{}/mcp", server.url());
        let count = manager.add_server("docs", &url).await.unwrap();
        assert_eq!(count, 1);

        let registry = manager.tools().await;
        assert!(registry.has("mcp_docs_search_docs"));
        let tool = registry.get("mcp_docs_search_docs").unwrap();
        assert_eq!(tool.description(), "[MCP:docs] Search the docs");

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_colliding_wrapped_names_keep_first_tool() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_handshake(&mut server, 2).await;
        let url = format!("{}/mcp", server.url());

        let manager = McpClientManager::new("voice-assistant", "0.1.0");
        manager.add_server("a-b", &url).await.unwrap();
        manager.add_server("a_b", &url).await.unwrap();

        let registry = manager.tools().await;
        assert_eq!(registry.len(), 1);
        let tool = registry.get("mcp_a_b_search_docs").unwrap();
        assert_eq!(tool.description(), "[MCP:a-b] Search the docs");
    }

    #[tokio::test]
    async fn test_call_tool_over_sse() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_handshake(&mut server, 1).await;
        let call = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({
                "method": "tools/call",
                "params": {"name": "search_docs", "arguments": {"query": "workers"}}
            })))
            .match_header("mcp-session-id", "session-1")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(format!(
                "event: message\ndata: {}\n\n",
                rpc_result(3, json!({"content": [{"type": "text", "text": "Workers docs"}]}))
            ))
            .create_async()
            .await;

        let manager = McpClientManager::new("voice-assistant", "0.1.0");
        manager
            .add_server("docs", &format!("{}/mcp", server.url()))
            .await
            .unwrap();

        let registry = manager.tools().await;
        let output = registry
            .execute("mcp_docs_search_docs", json!({"query": "workers"}))
            .await;
        assert_eq!(output, "Workers docs");
        call.assert_async().await;
    }

    #[tokio::test]
    async fn test_close_terminates_and_reconnects_lazily() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_handshake(&mut server, 2).await;
        let delete = server
            .mock("DELETE", "/mcp")
            .match_header("mcp-session-id", "session-1")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let manager = McpClientManager::new("voice-assistant", "0.1.0");
        manager
            .add_server("docs", &format!("{}/mcp", server.url()))
            .await
            .unwrap();
        assert_eq!(manager.open_connections().await, 1);

        manager.close_all_connections().await;
        assert_eq!(manager.open_connections().await, 0);
        assert_eq!(manager.server_names().await, vec!["docs".to_string()]);
        delete.assert_async().await;

        let registry = manager.tools().await;
        assert_eq!(registry.len(), 1);
        assert_eq!(manager.open_connections().await, 1);
    }

    #[tokio::test]
    async fn test_add_server_failure_is_not_registered() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/mcp")
            .with_status(500)
            .create_async()
            .await;

        let manager = McpClientManager::new("voice-assistant", "0.1.0");
        let err = manager
            .add_server("broken", &format!("{}/mcp", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Connection(_)));
        assert!(manager.server_names().await.is_empty());
        assert!(manager.tools().await.is_empty());
    }
}
