// crates/agent-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Agent Gate Interfaces
// Description: Backend-agnostic interfaces for identity, policy, and audit.
// Purpose: Define the contract surfaces used by the enforcement runtime.
// Dependencies: crate::core, async-trait
// ============================================================================

//! ## Overview
//! Interfaces define how Agent Gate talks to the external identity authority,
//! policy authority, and audit sink without embedding backend details. The
//! runtime treats every failure returned here as a reason to deny.
//!
//! Security posture: authority responses are untrusted; implementations must
//! report malformed payloads as errors rather than guessing a decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Agent;
use crate::core::AgentId;
use crate::core::AuditRecord;
use crate::core::ClientMetadata;
use crate::core::EnforcementContext;
use crate::core::PolicyDecision;
use crate::core::PolicyId;
use crate::core::ToolName;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures reported by identity or policy authorities.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// Authority could not be reached or timed out.
    #[error("authority unavailable: {0}")]
    Unavailable(String),
    /// Authority refused the request.
    #[error("authority rejected request: {0}")]
    Rejected(String),
    /// Authority replied with a payload that could not be interpreted.
    #[error("malformed authority response: {0}")]
    Malformed(String),
}

/// Failures reported by audit sinks.
///
/// # Invariants
/// - Never alters an allow/deny decision already made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// Audit record could not be serialized.
    #[error("audit serialization failed: {0}")]
    Serialization(String),
    /// Audit destination rejected or failed to store the record.
    #[error("audit sink failed: {0}")]
    Sink(String),
}

// ============================================================================
// SECTION: Identity Authority
// ============================================================================

/// Registration payload sent to the identity authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    /// Declared client name.
    pub name: String,
    /// Declared client version.
    pub version: String,
    /// Declared capability names.
    pub capabilities: BTreeSet<String>,
}

impl RegistrationRequest {
    /// Builds a registration request from client metadata.
    #[must_use]
    pub fn from_metadata(metadata: &ClientMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            capabilities: metadata.capabilities.clone(),
        }
    }
}

/// Identity assigned by the authority on registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredAgent {
    /// Authority-assigned agent identifier.
    pub agent_id: AgentId,
    /// Decentralized identifier, when the authority issues one.
    #[serde(default)]
    pub did: Option<String>,
    /// Developer decentralized identifier, when the authority issues one.
    #[serde(default)]
    pub developer_did: Option<String>,
}

/// Authorization credential valid for exactly one policy evaluation.
///
/// # Invariants
/// - Neither `Clone` nor `Copy`: passing it to [`PolicyAuthority::evaluate`]
///   consumes it, so a credential cannot back two decisions.
/// - `Debug` output is redacted.
pub struct SingleUseCredential(String);

impl SingleUseCredential {
    /// Wraps a freshly issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token for transmission.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consumes the credential, returning the raw token.
    #[must_use]
    pub fn into_token(self) -> String {
        self.0
    }
}

impl fmt::Debug for SingleUseCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SingleUseCredential(<redacted>)")
    }
}

/// Identity authority interface.
#[async_trait]
pub trait IdentityAuthority: Send + Sync {
    /// Registers a client and returns the assigned identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when registration fails.
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegisteredAgent, AuthorityError>;

    /// Issues a fresh single-use credential scoped to `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when issuance fails.
    async fn issue_credential(&self, agent: &Agent) -> Result<SingleUseCredential, AuthorityError>;
}

// ============================================================================
// SECTION: Policy Authority
// ============================================================================

/// Policy evaluation request.
///
/// # Invariants
/// - `action` is the tool name; `resource` is resolved before submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyRequest {
    /// Policy to evaluate against.
    pub policy_id: PolicyId,
    /// Action being authorized.
    pub action: ToolName,
    /// Resource being accessed.
    pub resource: String,
    /// Merged enforcement context.
    pub context: EnforcementContext,
}

/// Policy authority interface.
#[async_trait]
pub trait PolicyAuthority: Send + Sync {
    /// Evaluates the request, consuming the credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when evaluation cannot produce a decision.
    async fn evaluate(
        &self,
        request: &PolicyRequest,
        credential: SingleUseCredential,
    ) -> Result<PolicyDecision, AuthorityError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Destination for decision audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one audit record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record cannot be stored.
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// No-op audit sink.
///
/// # Invariants
/// - Records are intentionally discarded.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}
