// crates/agent-gate-core/src/runtime/directory.rs
// ============================================================================
// Module: Agent Directory
// Description: Process-wide signature to agent cache with single-flight registration.
// Purpose: Ensure each client signature registers with the authority exactly once.
// Dependencies: crate::{core, interfaces}, dashmap, tokio
// ============================================================================

//! ## Overview
//! The directory maps each [`ClientSignature`] to the [`Agent`] the identity
//! authority assigned it. Every signature owns a slot holding an async
//! once-cell. Concurrent first requests for the same signature share one
//! registration; requests for different signatures never wait on each other.
//!
//! A failed registration leaves the slot empty, so the next request retries.
//! Nothing is cached on failure. A caller that abandons its request while a
//! registration is in flight hands the registration to the next waiter.
//!
//! Entries live for the lifetime of the process. There is no eviction and no
//! persistence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::core::Agent;
use crate::core::ClientIdentity;
use crate::core::ClientSignature;
use crate::core::Timestamp;
use crate::interfaces::IdentityAuthority;
use crate::interfaces::RegistrationRequest;
use crate::runtime::error::DirectoryError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared registration slot for one signature.
type AgentSlot = Arc<OnceCell<Arc<Agent>>>;

/// Signature-keyed agent cache.
///
/// # Invariants
/// - At most one registration per signature is in flight at any time.
/// - A signature maps to the same [`Agent`] for the life of the process once
///   registration succeeds.
/// - Map guards are never held across an await point.
#[derive(Debug, Default)]
pub struct AgentDirectory {
    /// Registration slots keyed by signature.
    slots: DashMap<ClientSignature, AgentSlot>,
}

impl AgentDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the agent for `identity`, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Registration`] when the identity authority
    /// fails. The failure is not cached.
    pub async fn get_or_register(
        &self,
        identity: &ClientIdentity,
        authority: &dyn IdentityAuthority,
    ) -> Result<Arc<Agent>, DirectoryError> {
        if let Some(agent) = self.get(&identity.signature) {
            tracing::debug!(signature = %identity.signature, "agent directory hit");
            return Ok(agent);
        }
        let slot = self.slot(&identity.signature);
        let agent = slot.get_or_try_init(|| register(identity, authority)).await?;
        Ok(Arc::clone(agent))
    }

    /// Returns the registered agent for a signature, if any.
    #[must_use]
    pub fn get(&self, signature: &ClientSignature) -> Option<Arc<Agent>> {
        self.slots.get(signature).and_then(|slot| slot.get().cloned())
    }

    /// Returns the number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    /// Returns true when no agent has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of all registered agents.
    #[must_use]
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.slots.iter().filter_map(|slot| slot.get().cloned()).collect()
    }

    /// Returns the slot for a signature, creating it when absent.
    fn slot(&self, signature: &ClientSignature) -> AgentSlot {
        let entry = self.slots.entry(signature.clone()).or_default();
        Arc::clone(entry.value())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Registers `identity` with the authority and builds the cached agent.
async fn register(
    identity: &ClientIdentity,
    authority: &dyn IdentityAuthority,
) -> Result<Arc<Agent>, DirectoryError> {
    let request = RegistrationRequest::from_metadata(&identity.metadata);
    let registered = match authority.register(&request).await {
        Ok(registered) => registered,
        Err(err) => {
            tracing::warn!(
                signature = %identity.signature,
                error = %err,
                "agent registration failed"
            );
            return Err(DirectoryError::Registration {
                signature: identity.signature.clone(),
                message: err.to_string(),
            });
        }
    };
    tracing::info!(
        signature = %identity.signature,
        agent_id = %registered.agent_id,
        "agent registered"
    );
    Ok(Arc::new(Agent {
        agent_id: registered.agent_id,
        signature: identity.signature.clone(),
        metadata: Arc::clone(&identity.metadata),
        registered_at: Timestamp::now(),
        did: registered.did,
        developer_did: registered.developer_did,
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
