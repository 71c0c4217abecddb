// crates/agent-gate-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tool Registry
// Description: JSON adapters and the name-keyed registry of hosted tools.
// Purpose: Bridge typed tools to JSON-RPC `tools/list` and `tools/call`.
// Dependencies: agent-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Hosted tools are typed [`Tool`] implementations, usually a
//! [`agent_gate_core::GuardedTool`]. [`json_tool`] erases the argument and
//! output types so the host can decode `arguments` objects and encode results
//! without knowing the tool. The registry rejects duplicate names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use agent_gate_core::CallScope;
use agent_gate_core::Tool;
use agent_gate_core::ToolError;
use agent_gate_core::ToolSignature;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::server::McpServerError;

// ============================================================================
// SECTION: Tool Definition
// ============================================================================

/// Tool metadata advertised through `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the `arguments` object.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Builds a definition whose schema requires every declared parameter.
    #[must_use]
    pub fn from_signature(signature: &ToolSignature, description: impl Into<String>) -> Self {
        let properties: Map<String, Value> =
            signature.params.iter().map(|param| (param.clone(), json!({}))).collect();
        Self {
            name: signature.name.to_string(),
            description: description.into(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": signature.params,
            }),
        }
    }

    /// Replaces the generated input schema.
    #[must_use]
    pub fn with_input_schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }
}

// ============================================================================
// SECTION: JSON Tools
// ============================================================================

/// Type-erased tool invoked with JSON arguments.
#[async_trait]
pub trait JsonTool: Send + Sync {
    /// Returns the advertised definition.
    fn definition(&self) -> &ToolDefinition;

    /// Decodes `arguments`, invokes the tool, and encodes the output.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when decoding, enforcement, or the tool fails.
    async fn call_json(&self, scope: &CallScope, arguments: Value) -> Result<Value, ToolError>;
}

/// Adapter from a typed tool to [`JsonTool`].
struct JsonToolAdapter<T> {
    /// Wrapped tool.
    tool: T,
    /// Advertised definition.
    definition: ToolDefinition,
}

#[async_trait]
impl<T> JsonTool for JsonToolAdapter<T>
where
    T: Tool,
    T::Args: DeserializeOwned,
    T::Output: Serialize,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call_json(&self, scope: &CallScope, arguments: Value) -> Result<Value, ToolError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let args: T::Args = serde_json::from_value(arguments)
            .map_err(|err| ToolError::InvalidArguments(err.to_string()))?;
        let output = self.tool.call(scope, args).await?;
        serde_json::to_value(output)
            .map_err(|err| ToolError::Failed(format!("output serialization failed: {err}")))
    }
}

/// Wraps a typed tool for hosting, advertising `description`.
#[must_use]
pub fn json_tool<T>(tool: T, description: impl Into<String>) -> Arc<dyn JsonTool>
where
    T: Tool + 'static,
    T::Args: DeserializeOwned,
    T::Output: Serialize,
{
    let definition = ToolDefinition::from_signature(tool.signature(), description);
    json_tool_with_definition(tool, definition)
}

/// Wraps a typed tool with an explicit definition.
#[must_use]
pub fn json_tool_with_definition<T>(tool: T, definition: ToolDefinition) -> Arc<dyn JsonTool>
where
    T: Tool + 'static,
    T::Args: DeserializeOwned,
    T::Output: Serialize,
{
    Arc::new(JsonToolAdapter {
        tool,
        definition,
    })
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Name-keyed registry of hosted tools.
///
/// # Invariants
/// - Tool names are unique.
/// - Listing order is sorted by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    /// Registered tools by name.
    tools: BTreeMap<String, Arc<dyn JsonTool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::DuplicateTool`] when the name is taken.
    pub fn register(&mut self, tool: Arc<dyn JsonTool>) -> Result<(), McpServerError> {
        let name = tool.definition().name.clone();
        if self.tools.contains_key(&name) {
            return Err(McpServerError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Returns the tool registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn JsonTool>> {
        self.tools.get(name)
    }

    /// Returns every definition in name order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition().clone()).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
