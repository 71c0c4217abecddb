// crates/agent-gate-core/src/runtime/error.rs
// ============================================================================
// Module: Enforcement Errors
// Description: Error taxonomy for the enforcement pipeline.
// Purpose: Separate "not authorized" from "unable to authorize" failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every variant of [`EnforcementError`] aborts the guarded tool. The
//! [`ErrorClass`] of an error tells callers whether the policy said no,
//! whether the infrastructure failed, or whether the wiring is wrong; these
//! must never be conflated, or outages would look like access decisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ClientSignature;
use crate::core::ConnectionId;
use crate::core::ToolName;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Programming or wiring errors. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No client metadata was captured for the connection.
    #[error("no client metadata for connection {connection_id}; initialize hook not installed")]
    MissingClientInfo {
        /// Connection the call arrived on.
        connection_id: ConnectionId,
    },
    /// Neither a per-tool policy nor a default policy is configured.
    #[error("no policy configured for tool {tool} and no default policy set")]
    MissingPolicy {
        /// Tool being enforced.
        tool: ToolName,
    },
    /// Context builder parameters do not match the tool parameters.
    #[error(
        "context builder for tool {tool} declares ({}) but the tool takes ({})",
        declared.join(", "),
        expected.join(", ")
    )]
    ContextBuilderMismatch {
        /// Tool being wrapped.
        tool: ToolName,
        /// Parameters declared by the tool.
        expected: Vec<String>,
        /// Parameters declared by the context builder.
        declared: Vec<String>,
    },
    /// Context builder could not build a context from the arguments.
    #[error("context builder for tool {tool} failed: {message}")]
    ContextBuild {
        /// Tool being enforced.
        tool: ToolName,
        /// Builder failure message.
        message: String,
    },
}

// ============================================================================
// SECTION: Directory Errors
// ============================================================================

/// Agent directory failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Registration with the identity authority failed. Nothing was cached.
    #[error("registration for {signature} failed: {message}")]
    Registration {
        /// Signature being registered.
        signature: ClientSignature,
        /// Authority failure message.
        message: String,
    },
}

// ============================================================================
// SECTION: Enforcement Errors
// ============================================================================

/// High-level classification of an enforcement failure.
///
/// # Invariants
/// - Variants are stable for transport error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The policy authority explicitly denied the call.
    Denied,
    /// The system was unable to reach a decision.
    Unavailable,
    /// The enforcement wiring is wrong.
    Misconfigured,
}

impl ErrorClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Denied => "denied",
            Self::Unavailable => "unavailable",
            Self::Misconfigured => "misconfigured",
        }
    }
}

/// Enforcement pipeline failures. Every variant blocks the tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnforcementError {
    /// Wiring error detected at call or wrap time.
    #[error("authorization misconfigured: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Agent registration failed.
    #[error("unable to authorize: agent registration failed: {0}")]
    Registration(String),
    /// Credential issuance failed.
    #[error("unable to authorize: credential issuance failed: {0}")]
    Credential(String),
    /// Policy evaluation failed or returned a malformed decision.
    #[error("unable to authorize: policy evaluation failed: {0}")]
    PolicyEvaluation(String),
    /// Policy authority returned `allow = false`.
    #[error("not authorized: {reason}")]
    AccessDenied {
        /// Reason supplied by the policy.
        reason: String,
    },
}

impl EnforcementError {
    /// Returns a stable label for the failing stage.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Registration(_) => "registration",
            Self::Credential(_) => "credential",
            Self::PolicyEvaluation(_) => "policy_evaluation",
            Self::AccessDenied {
                ..
            } => "access_denied",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AccessDenied {
                ..
            } => ErrorClass::Denied,
            Self::Configuration(_) => ErrorClass::Misconfigured,
            Self::Registration(_) | Self::Credential(_) | Self::PolicyEvaluation(_) => {
                ErrorClass::Unavailable
            }
        }
    }
}

impl From<DirectoryError> for EnforcementError {
    fn from(error: DirectoryError) -> Self {
        Self::Registration(error.to_string())
    }
}
