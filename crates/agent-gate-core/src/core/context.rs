// crates/agent-gate-core/src/core/context.rs
// ============================================================================
// Module: Enforcement Context
// Description: Per-call context mapping submitted for policy evaluation.
// Purpose: Merge caller-derived context with standard agent fields.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`EnforcementContext`] is built from a tool's call arguments by the
//! caller-supplied context builder, then merged with the standard agent
//! fields. Standard fields always win over caller keys of the same name so a
//! tool cannot impersonate another agent through its own arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::agent::Agent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Context key carrying the agent's declared capabilities.
pub const CONTEXT_CAPABILITIES: &str = "capabilities";
/// Context key carrying the agent's declared name.
pub const CONTEXT_AGENT_NAME: &str = "agent_name";
/// Context key carrying the authority-assigned agent identifier.
pub const CONTEXT_AGENT_ID: &str = "agent_id";
/// Context key carrying the identity tier label.
pub const CONTEXT_IDENTITY_TIER: &str = "identity_tier";

// ============================================================================
// SECTION: Enforcement Context
// ============================================================================

/// Context mapping for one enforcement call.
///
/// # Invariants
/// - Transient: built per call, never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnforcementContext(Map<String, Value>);

impl EnforcementContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON object map.
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a value, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the context has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Merges the standard agent fields, overwriting caller keys.
    #[must_use]
    pub fn with_agent(mut self, agent: &Agent) -> Self {
        let capabilities =
            agent.metadata.capabilities.iter().cloned().map(Value::String).collect::<Vec<_>>();
        self.insert(CONTEXT_CAPABILITIES, Value::Array(capabilities));
        self.insert(CONTEXT_AGENT_NAME, Value::String(agent.metadata.name.clone()));
        self.insert(CONTEXT_AGENT_ID, Value::String(agent.agent_id.as_str().to_string()));
        self.insert(
            CONTEXT_IDENTITY_TIER,
            Value::String(agent.metadata.tier.as_str().to_string()),
        );
        self
    }
}
