// crates/agent-gate-core/src/runtime/extractor.rs
// ============================================================================
// Module: Client Signature Extractor
// Description: Derive client signatures and metadata from handshake payloads.
// Purpose: Let connection-scoped calls recover the caller's declared identity.
// Dependencies: crate::core, dashmap, tracing
// ============================================================================

//! ## Overview
//! Extraction is a pure function of the handshake payload. It never fails:
//! missing or blank names and versions become [`PLACEHOLDER_IDENTITY`] with
//! the placeholder tier. [`ClientInfoStore`] is the connection-keyed lookup
//! that the transport writes at handshake time and the gate reads at call time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::core::ClientHandshake;
use crate::core::ClientIdentity;
use crate::core::ClientMetadata;
use crate::core::ConnectionId;
use crate::core::IdentityTier;
use crate::core::PLACEHOLDER_IDENTITY;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Derives a client identity from a handshake payload without side effects.
#[must_use]
pub fn extract_client_identity(handshake: &ClientHandshake) -> ClientIdentity {
    let name = declared_value(handshake.name.as_deref());
    let version = declared_value(handshake.version.as_deref());
    let tier = if name.is_some() && version.is_some() {
        IdentityTier::Declared
    } else {
        IdentityTier::Placeholder
    };
    let metadata = ClientMetadata {
        name: name.unwrap_or(PLACEHOLDER_IDENTITY).to_string(),
        version: version.unwrap_or(PLACEHOLDER_IDENTITY).to_string(),
        capabilities: capability_names(&handshake.capabilities),
        raw: handshake.raw.clone(),
        tier,
    };
    ClientIdentity::from_metadata(metadata)
}

/// Extracts the client identity and stores it for `connection_id`.
///
/// Any previous entry for the connection is replaced.
pub fn capture_client_info(
    store: &ClientInfoStore,
    connection_id: &ConnectionId,
    handshake: &ClientHandshake,
) -> ClientIdentity {
    let identity = extract_client_identity(handshake);
    tracing::info!(
        connection_id = %connection_id,
        signature = %identity.signature,
        tier = identity.metadata.tier.as_str(),
        capabilities = identity.metadata.capabilities.len(),
        "captured client info"
    );
    store.insert(connection_id.clone(), identity.clone());
    identity
}

/// Returns the trimmed value when present and non-blank.
fn declared_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Reads capability names from an object descriptor or a string array.
fn capability_names(descriptor: &Value) -> BTreeSet<String> {
    match descriptor {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        _ => BTreeSet::new(),
    }
}

// ============================================================================
// SECTION: Connection Store
// ============================================================================

/// Connection-keyed client identity store.
///
/// # Invariants
/// - Cloning shares the same underlying map.
/// - Holds only process-lifetime state.
#[derive(Debug, Clone, Default)]
pub struct ClientInfoStore {
    /// Shared connection map.
    entries: Arc<DashMap<ConnectionId, ClientIdentity>>,
}

impl ClientInfoStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the identity for a connection, replacing any previous entry.
    pub fn insert(&self, connection_id: ConnectionId, identity: ClientIdentity) {
        self.entries.insert(connection_id, identity);
    }

    /// Returns the identity captured for a connection.
    #[must_use]
    pub fn get(&self, connection_id: &ConnectionId) -> Option<ClientIdentity> {
        self.entries.get(connection_id).map(|entry| entry.value().clone())
    }

    /// Removes the entry for a closed connection.
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<ClientIdentity> {
        self.entries.remove(connection_id).map(|(_, identity)| identity)
    }

    /// Returns the number of tracked connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no connections are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
