// crates/agent-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Agent Gate Identifiers
// Description: Canonical opaque identifiers for connections, agents, and tools.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Agent Gate. All
//! identifiers are opaque UTF-8 strings that serialize transparently. Only
//! [`ClientSignature`] has a derivation rule; the rest are assigned by the
//! transport, the identity authority, or the embedding application.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between declared client name and version in a signature.
pub const SIGNATURE_SEPARATOR: char = '@';
/// Escape prefix for separator and escape characters inside a declared name.
const SIGNATURE_ESCAPE: char = '%';

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Defines an opaque string identifier with the shared accessor surface.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_identifier!(
    /// Transport connection identifier (stdio process, HTTP session).
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; assigned by the transport layer.
    ConnectionId
);

string_identifier!(
    /// Agent identifier assigned by the identity authority.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; never derived locally.
    AgentId
);

string_identifier!(
    /// Policy identifier understood by the policy authority.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; use [`PolicyId::parse`] at trust boundaries.
    PolicyId
);

string_identifier!(
    /// Tool name used as the policy action.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; matches the name exposed by the tool host.
    ToolName
);

impl PolicyId {
    /// Parses a policy identifier, rejecting empty or whitespace-only input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() { None } else { Some(Self::new(trimmed)) }
    }
}

/// Deterministic cache key derived from a client's declared name and version.
///
/// # Invariants
/// - Identical name and version always yield an identical signature.
/// - Distinct name and version pairs yield distinct signatures; the name
///   never contains an unescaped [`SIGNATURE_SEPARATOR`].
/// - Not a credential: any client may declare any name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSignature(String);

impl ClientSignature {
    /// Derives a signature from declared name and version.
    #[must_use]
    pub fn from_parts(name: &str, version: &str) -> Self {
        let mut key = String::with_capacity(name.len() + version.len() + 1);
        for ch in name.chars() {
            match ch {
                SIGNATURE_ESCAPE => key.push_str("%25"),
                SIGNATURE_SEPARATOR => key.push_str("%40"),
                other => key.push(other),
            }
        }
        key.push(SIGNATURE_SEPARATOR);
        key.push_str(version);
        Self(key)
    }

    /// Returns the signature as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
