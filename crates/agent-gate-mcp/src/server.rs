// crates/agent-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Host
// Description: JSON-RPC 2.0 host for stdio and HTTP transports.
// Purpose: Run connection hooks on initialize and route tool calls.
// Dependencies: agent-gate-core, axum, dashmap, tokio
// ============================================================================

//! ## Overview
//! [`McpHost`] implements the MCP methods an enforcement host needs:
//! `initialize`, `notifications/initialized`, `ping`, `tools/list`, and
//! `tools/call`. Each transport assigns a [`ConnectionId`]: stdio uses
//! [`STDIO_CONNECTION_ID`] for its single connection; HTTP issues a random
//! `mcp-session-id` on every initialize and keys later requests by that
//! header. Only ids the host issued and has not closed are accepted.
//!
//! Enforcement failures surface as JSON-RPC errors whose code reflects the
//! failure class (denied, unavailable, misconfigured) and whose `data`
//! carries the stable error kind.
//!
//! Security posture: request bodies are untrusted and bounded by
//! `max_body_bytes`; handshake fields are passed to hooks without trust;
//! inbound session headers never choose the connection an initialize binds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use agent_gate_config::ServerConfig;
use agent_gate_config::ServerTransport;
use agent_gate_core::CallScope;
use agent_gate_core::ClientHandshake;
use agent_gate_core::ConnectionId;
use agent_gate_core::ErrorClass;
use agent_gate_core::ToolError;
use agent_gate_core::runtime::gate::DEFAULT_SERVER_NAME;
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use dashmap::DashSet;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;

use crate::tools::JsonTool;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Connection identifier used by the stdio transport.
pub const STDIO_CONNECTION_ID: &str = "stdio";
/// Header carrying the HTTP session identifier.
pub const SESSION_HEADER: &str = "mcp-session-id";
/// Protocol version advertised when the client does not request one.
const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";
/// JSON-RPC protocol version.
const JSONRPC_VERSION: &str = "2.0";
/// Default request body limit in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Invalid JSON payload.
const PARSE_ERROR: i64 = -32700;
/// Payload is not a valid request object.
const INVALID_REQUEST: i64 = -32600;
/// Unknown method or tool.
const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method or tool parameters.
const INVALID_PARAMS: i64 = -32602;
/// Tool body failed.
const TOOL_FAILED: i64 = -32000;
/// Policy denied the call.
const ACCESS_DENIED: i64 = -32003;
/// Authorities could not produce a decision.
const AUTHORIZATION_UNAVAILABLE: i64 = -32010;
/// Enforcement wiring is wrong.
const AUTHORIZATION_MISCONFIGURED: i64 = -32020;
/// Request body exceeds the configured limit.
const PAYLOAD_TOO_LARGE: i64 = -32070;
/// HTTP session was never issued or is already closed.
const UNKNOWN_SESSION: i64 = -32001;

// ============================================================================
// SECTION: Connection Hooks
// ============================================================================

/// Observer for connection lifecycle events.
pub trait ConnectionHook: Send + Sync {
    /// Called when a connection completes `initialize`.
    fn initialized(&self, connection_id: &ConnectionId, handshake: &ClientHandshake);

    /// Called when a connection ends.
    fn closed(&self, _connection_id: &ConnectionId) {}
}

// ============================================================================
// SECTION: MCP Host
// ============================================================================

/// MCP host instance.
///
/// # Invariants
/// - Tools and hooks are fixed once serving starts.
pub struct McpHost {
    /// Server name reported on initialize.
    name: String,
    /// Server version reported on initialize.
    version: String,
    /// Maximum request body size.
    max_body_bytes: usize,
    /// Hosted tools.
    tools: ToolRegistry,
    /// Connection lifecycle hooks.
    hooks: Vec<Arc<dyn ConnectionHook>>,
    /// Open HTTP sessions issued on initialize.
    sessions: DashSet<String>,
}

impl McpHost {
    /// Creates a host with the given server name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            tools: ToolRegistry::new(),
            hooks: Vec::new(),
            sessions: DashSet::new(),
        }
    }

    /// Creates a host from server configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.name.clone()).with_max_body_bytes(config.max_body_bytes)
    }

    /// Overrides the reported server version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Overrides the request body limit.
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Returns the server name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hosted tools.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Registers a hosted tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::DuplicateTool`] when the name is taken.
    pub fn register_tool(&mut self, tool: Arc<dyn JsonTool>) -> Result<(), McpServerError> {
        self.tools.register(tool)
    }

    /// Installs a connection lifecycle hook.
    pub fn add_connection_hook(&mut self, hook: Arc<dyn ConnectionHook>) {
        self.hooks.push(hook);
    }

    /// Handles one JSON-RPC message, returning `None` for notifications.
    pub async fn handle(
        &self,
        connection_id: &ConnectionId,
        message: Value,
    ) -> Option<JsonRpcResponse> {
        let request = match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => request,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc request"),
                ));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc version"),
            ));
        }
        tracing::debug!(
            connection_id = %connection_id,
            method = %request.method,
            "json-rpc request"
        );
        let Some(id) = request.id else {
            self.notify(connection_id, &request.method);
            return None;
        };
        let params = request.params.unwrap_or(Value::Null);
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize(connection_id, &params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => {
                let scope =
                    CallScope::new(connection_id.clone()).with_request_id(request_label(&id));
                self.call_tool(&scope, params).await
            }
            _ => Err(JsonRpcError::new(METHOD_NOT_FOUND, "method not found")),
        };
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    /// Runs the `closed` hooks for a connection.
    pub fn connection_closed(&self, connection_id: &ConnectionId) {
        for hook in &self.hooks {
            hook.closed(connection_id);
        }
        tracing::debug!(connection_id = %connection_id, "connection closed");
    }

    /// Runs the `initialized` hooks and returns the initialize result.
    fn initialize(&self, connection_id: &ConnectionId, params: &Value) -> Value {
        let handshake = handshake_from_params(params);
        for hook in &self.hooks {
            hook.initialized(connection_id, &handshake);
        }
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.name, "version": self.version },
        })
    }

    /// Handles a notification.
    fn notify(&self, connection_id: &ConnectionId, method: &str) {
        if method != "notifications/initialized" {
            tracing::debug!(connection_id = %connection_id, method, "ignored notification");
        }
    }

    /// Routes a `tools/call` request.
    async fn call_tool(&self, scope: &CallScope, params: Value) -> Result<Value, JsonRpcError> {
        let call = serde_json::from_value::<ToolCallParams>(params)
            .map_err(|_| JsonRpcError::new(INVALID_PARAMS, "invalid tool params"))?;
        let tool = self.tools.get(&call.name).ok_or_else(|| {
            JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown tool: {}", call.name))
        })?;
        let output = tool.call_json(scope, call.arguments).await.map_err(|err| tool_error(&err))?;
        let text = serde_json::to_string(&output)
            .map_err(|_| JsonRpcError::new(TOOL_FAILED, "tool output serialization failed"))?;
        Ok(json!({
            "content": [ToolContent::Text { text }],
            "structuredContent": output,
            "isError": false,
        }))
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self, config: &ServerConfig) -> Result<(), McpServerError> {
        match config.transport {
            ServerTransport::Stdio => self.serve_stdio().await,
            ServerTransport::Http => {
                let addr =
                    config.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
                self.serve_http(listener).await
            }
        }
    }

    /// Serves the single stdio connection until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when framing or I/O fails.
    pub async fn serve_stdio(self) -> Result<(), McpServerError> {
        self.serve_framed(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serves Content-Length framed JSON-RPC over a reader/writer pair.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when framing or I/O fails.
    pub async fn serve_framed<R, W>(&self, reader: R, mut writer: W) -> Result<(), McpServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let connection_id = ConnectionId::new(STDIO_CONNECTION_ID);
        let mut reader = BufReader::new(reader);
        let result = self.run_framed(&connection_id, &mut reader, &mut writer).await;
        self.connection_closed(&connection_id);
        result
    }

    /// Reads frames until end of input, answering each request.
    async fn run_framed<R, W>(
        &self,
        connection_id: &ConnectionId,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<(), McpServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(bytes) = read_framed(reader, self.max_body_bytes).await? {
            let response = match serde_json::from_slice::<Value>(&bytes) {
                Ok(message) => self.handle(connection_id, message).await,
                Err(_) => Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, "invalid json"),
                )),
            };
            if let Some(response) = response {
                let payload = serde_json::to_vec(&response).map_err(|_| {
                    McpServerError::Transport("json-rpc serialization failed".to_string())
                })?;
                write_framed(writer, &payload).await?;
            }
        }
        Ok(())
    }

    /// Serves JSON-RPC over HTTP on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve_http(self, listener: TcpListener) -> Result<(), McpServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, server = %self.name, "mcp http transport listening");
        }
        axum::serve(listener, self.into_router())
            .await
            .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
    }

    /// Builds the HTTP router serving `POST /mcp` and `DELETE /mcp`.
    #[must_use]
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/mcp", post(handle_http).delete(handle_http_close))
            .with_state(Arc::new(self))
    }
}

impl Default for McpHost {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_NAME)
    }
}

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Structured error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Builds an error without detail.
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool output content block.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Serialized JSON output.
    Text {
        /// JSON text.
        text: String,
    },
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(host): State<Arc<McpHost>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let Ok(bytes) = axum::body::to_bytes(body, host.max_body_bytes).await else {
        let error = JsonRpcError::new(PAYLOAD_TOO_LARGE, "request body too large");
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(JsonRpcResponse::failure(Value::Null, error)))
            .into_response();
    };
    let Ok(message) = serde_json::from_slice::<Value>(&bytes) else {
        let error = JsonRpcError::new(PARSE_ERROR, "invalid json");
        return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::failure(Value::Null, error)))
            .into_response();
    };
    let is_initialize = message.get("method").and_then(Value::as_str) == Some("initialize");
    let connection_id = if is_initialize {
        let session = new_session_id();
        host.sessions.insert(session.clone());
        ConnectionId::new(session)
    } else {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        match headers.get(SESSION_HEADER).and_then(|value| value.to_str().ok()) {
            Some(session) if host.sessions.contains(session) => ConnectionId::new(session),
            Some(_) => {
                let error = JsonRpcError::new(UNKNOWN_SESSION, "unknown or closed session");
                return (StatusCode::NOT_FOUND, Json(JsonRpcResponse::failure(id, error)))
                    .into_response();
            }
            None => {
                let error =
                    JsonRpcError::new(INVALID_REQUEST, format!("missing {SESSION_HEADER} header"));
                return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::failure(id, error)))
                    .into_response();
            }
        }
    };
    let mut response = match host.handle(&connection_id, message).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if is_initialize && let Ok(value) = HeaderValue::from_str(connection_id.as_str()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Ends an HTTP session issued by this host.
async fn handle_http_close(State(host): State<Arc<McpHost>>, headers: HeaderMap) -> StatusCode {
    let Some(session) = headers.get(SESSION_HEADER).and_then(|value| value.to_str().ok()) else {
        return StatusCode::BAD_REQUEST;
    };
    if host.sessions.remove(session).is_none() {
        return StatusCode::NOT_FOUND;
    }
    host.connection_closed(&ConnectionId::new(session));
    StatusCode::NO_CONTENT
}

/// Generates a random 128-bit hex session identifier.
fn new_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the extractor input from `initialize` params.
fn handshake_from_params(params: &Value) -> ClientHandshake {
    let client_info = params.get("clientInfo").and_then(Value::as_object);
    let field = |key: &str| {
        client_info
            .and_then(|info| info.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let mut raw = Map::new();
    if let Some(info) = client_info {
        for (key, value) in info {
            if key != "name" && key != "version" {
                raw.insert(key.clone(), value.clone());
            }
        }
    }
    if let Some(protocol_version) = params.get("protocolVersion") {
        raw.insert("protocolVersion".to_string(), protocol_version.clone());
    }
    ClientHandshake {
        name: field("name"),
        version: field("version"),
        capabilities: params.get("capabilities").cloned().unwrap_or(Value::Null),
        raw,
    }
}

/// Renders a request id for call scopes.
fn request_label(id: &Value) -> String {
    match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

/// Maps a tool failure onto a JSON-RPC error.
fn tool_error(error: &ToolError) -> JsonRpcError {
    match error {
        ToolError::Enforcement(err) => {
            let class = err.class();
            let code = match class {
                ErrorClass::Denied => ACCESS_DENIED,
                ErrorClass::Unavailable => AUTHORIZATION_UNAVAILABLE,
                ErrorClass::Misconfigured => AUTHORIZATION_MISCONFIGURED,
            };
            JsonRpcError {
                code,
                message: err.to_string(),
                data: Some(json!({ "kind": err.kind(), "class": class.as_str() })),
            }
        }
        ToolError::InvalidArguments(_) => JsonRpcError::new(INVALID_PARAMS, error.to_string()),
        ToolError::Failed(_) => JsonRpcError::new(TOOL_FAILED, error.to_string()),
    }
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed payload using Content-Length headers.
///
/// Returns `None` at end of input between frames.
async fn read_framed<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if in_headers {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            if in_headers {
                break;
            }
            continue;
        }
        in_headers = true;
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed payload using Content-Length headers.
async fn write_framed<W>(writer: &mut W, payload: &[u8]) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .flush()
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP host errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
    /// A tool with the same name is already registered.
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
