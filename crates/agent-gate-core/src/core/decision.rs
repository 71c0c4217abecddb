// crates/agent-gate-core/src/core/decision.rs
// ============================================================================
// Module: Policy Decisions and Audit Records
// Description: Decision payloads returned by the policy authority and audit records.
// Purpose: Carry allow/deny outcomes and their audit trail.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`PolicyDecision`] is the transient result of one evaluation call and is
//! never cached. Every decision produces exactly one [`AuditRecord`], whether
//! it allowed or denied the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::agent::Timestamp;
use crate::core::client::IdentityTier;
use crate::core::context::EnforcementContext;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::PolicyId;
use crate::core::identifiers::ToolName;

// ============================================================================
// SECTION: Policy Decision
// ============================================================================

/// Policy authority decision for one evaluation.
///
/// # Invariants
/// - `allow` is the authoritative outcome; `raw` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the call is permitted.
    pub allow: bool,
    /// Reason supplied by the policy, when any.
    #[serde(default)]
    pub reason: Option<String>,
    /// Raw authority response payload.
    #[serde(default)]
    pub raw: Value,
}

impl PolicyDecision {
    /// Builds an allow decision.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allow: true,
            reason: None,
            raw: Value::Null,
        }
    }

    /// Builds a deny decision with a reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(reason.into()),
            raw: Value::Null,
        }
    }

    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn outcome_label(&self) -> &'static str {
        if self.allow { "allow" } else { "deny" }
    }
}

// ============================================================================
// SECTION: Audit Record
// ============================================================================

/// Audit record emitted for every policy decision.
///
/// # Invariants
/// - Emitted for both allow and deny outcomes.
/// - Never consulted when making a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Event identifier.
    pub event: String,
    /// Agent the decision applied to.
    pub agent_id: AgentId,
    /// Action evaluated (tool name).
    pub action: ToolName,
    /// Resource evaluated.
    pub resource: String,
    /// Policy used for the evaluation.
    pub policy_id: PolicyId,
    /// Context submitted to the policy authority.
    pub context: EnforcementContext,
    /// Decision returned by the policy authority.
    pub decision: PolicyDecision,
    /// Identity tier of the calling client.
    pub identity_tier: IdentityTier,
    /// Request identifier when the transport supplied one.
    pub request_id: Option<String>,
    /// Decision time.
    pub timestamp: Timestamp,
}

/// Inputs required to construct an audit record.
pub struct AuditRecordParams {
    /// Agent the decision applied to.
    pub agent_id: AgentId,
    /// Action evaluated (tool name).
    pub action: ToolName,
    /// Resource evaluated.
    pub resource: String,
    /// Policy used for the evaluation.
    pub policy_id: PolicyId,
    /// Context submitted to the policy authority.
    pub context: EnforcementContext,
    /// Decision returned by the policy authority.
    pub decision: PolicyDecision,
    /// Identity tier of the calling client.
    pub identity_tier: IdentityTier,
    /// Request identifier when the transport supplied one.
    pub request_id: Option<String>,
}

impl AuditRecord {
    /// Creates a new audit record stamped with the current time.
    #[must_use]
    pub fn new(params: AuditRecordParams) -> Self {
        Self {
            event: "policy_decision".to_string(),
            agent_id: params.agent_id,
            action: params.action,
            resource: params.resource,
            policy_id: params.policy_id,
            context: params.context,
            decision: params.decision,
            identity_tier: params.identity_tier,
            request_id: params.request_id,
            timestamp: Timestamp::now(),
        }
    }
}
