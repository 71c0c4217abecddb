// crates/agent-gate-core/src/core/client.rs
// ============================================================================
// Module: Client Metadata
// Description: Per-connection client metadata captured at handshake time.
// Purpose: Describe who is calling before an agent identity exists.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Client metadata is captured once per connection from the transport
//! handshake and never mutated afterwards. Clients that omit their declared
//! name or version still get metadata, marked with the placeholder
//! [`IdentityTier`] so policies and audit consumers can tell the difference
//! between "a client named unknown" and "a client that did not say".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ClientSignature;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder substituted for a missing declared name or version.
pub const PLACEHOLDER_IDENTITY: &str = "unknown";

// ============================================================================
// SECTION: Handshake Payload
// ============================================================================

/// Raw client handshake data as delivered by the transport.
///
/// # Invariants
/// - All fields are untrusted and optional; extraction never fails on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientHandshake {
    /// Client-declared name.
    #[serde(default)]
    pub name: Option<String>,
    /// Client-declared semantic version.
    #[serde(default)]
    pub version: Option<String>,
    /// Client capabilities descriptor (object keys or string array).
    #[serde(default)]
    pub capabilities: Value,
    /// Remaining handshake fields, preserved verbatim.
    #[serde(default)]
    pub raw: Map<String, Value>,
}

// ============================================================================
// SECTION: Client Metadata
// ============================================================================

/// How the client identity was established.
///
/// # Invariants
/// - Variants are stable for policy context and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityTier {
    /// Client declared both a name and a version.
    Declared,
    /// At least one of name or version was missing and replaced.
    Placeholder,
}

impl IdentityTier {
    /// Returns a stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Placeholder => "placeholder",
        }
    }
}

/// Immutable snapshot of a client's declared metadata.
///
/// # Invariants
/// - `name` and `version` are never empty; missing values are
///   [`PLACEHOLDER_IDENTITY`] and `tier` is [`IdentityTier::Placeholder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Declared client name.
    pub name: String,
    /// Declared client version.
    pub version: String,
    /// Declared capability names.
    pub capabilities: BTreeSet<String>,
    /// Raw handshake fields.
    pub raw: Map<String, Value>,
    /// Identity tier for the declared name/version pair.
    pub tier: IdentityTier,
}

impl ClientMetadata {
    /// Returns the signature derived from the declared name and version.
    #[must_use]
    pub fn signature(&self) -> ClientSignature {
        ClientSignature::from_parts(&self.name, &self.version)
    }
}

/// Signature and metadata pair stored per connection.
///
/// # Invariants
/// - `signature == metadata.signature()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIdentity {
    /// Cache key for the agent directory.
    pub signature: ClientSignature,
    /// Shared metadata snapshot.
    pub metadata: Arc<ClientMetadata>,
}

impl ClientIdentity {
    /// Builds an identity from metadata, deriving the signature.
    #[must_use]
    pub fn from_metadata(metadata: ClientMetadata) -> Self {
        Self {
            signature: metadata.signature(),
            metadata: Arc::new(metadata),
        }
    }
}
