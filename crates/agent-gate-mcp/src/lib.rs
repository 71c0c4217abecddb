// crates/agent-gate-mcp/src/lib.rs
// ============================================================================
// Module: Agent Gate MCP
// Description: MCP host, setup wiring, and local audit sinks for Agent Gate.
// Purpose: Expose policy-guarded tools to MCP clients over stdio or HTTP.
// Dependencies: agent-gate-core, agent-gate-config, agent-gate-authority, axum, tokio
// ============================================================================

//! ## Overview
//! Agent Gate MCP hosts tools over JSON-RPC 2.0. The `initialize` handshake
//! feeds the client signature extractor through a connection hook installed
//! by [`setup`], and `tools/call` routes to registered tools, which are
//! usually [`agent_gate_core::GuardedTool`]s produced by the returned
//! [`agent_gate_core::PolicyGate`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;
pub mod setup;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::TracingAuditSink;
pub use server::ConnectionHook;
pub use server::JsonRpcError;
pub use server::JsonRpcResponse;
pub use server::McpHost;
pub use server::McpServerError;
pub use server::SESSION_HEADER;
pub use server::STDIO_CONNECTION_ID;
pub use setup::SetupError;
pub use setup::SetupParams;
pub use setup::setup;
pub use setup::setup_from_config;
pub use telemetry::TelemetryError;
pub use telemetry::init_tracing;
pub use tools::JsonTool;
pub use tools::ToolDefinition;
pub use tools::ToolRegistry;
pub use tools::json_tool;
pub use tools::json_tool_with_definition;
