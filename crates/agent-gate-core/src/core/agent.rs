// crates/agent-gate-core/src/core/agent.rs
// ============================================================================
// Module: Agent Identity
// Description: Registered agent records and wall-clock timestamps.
// Purpose: Represent the durable identity bound to a client signature.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Agent`] is created once per distinct client signature, after the
//! identity authority has assigned it an identifier. Agents are immutable and
//! live for the process lifetime; they are shared as `Arc<Agent>`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::core::client::ClientMetadata;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::ClientSignature;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Wall-clock timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from raw unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Captures the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> u64 {
        self.0
    }
}

// ============================================================================
// SECTION: Agent
// ============================================================================

/// Registered agent identity.
///
/// # Invariants
/// - Exactly one `Agent` exists per [`ClientSignature`] per process.
/// - Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    /// Identifier assigned by the identity authority.
    pub agent_id: AgentId,
    /// Signature the agent was registered under.
    pub signature: ClientSignature,
    /// Client metadata captured at first registration.
    pub metadata: Arc<ClientMetadata>,
    /// Registration time.
    pub registered_at: Timestamp,
    /// Decentralized identifier returned by the authority, when provided.
    pub did: Option<String>,
    /// Developer decentralized identifier, when provided.
    pub developer_did: Option<String>,
}

impl Agent {
    /// Returns the declared client name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}
