// crates/agent-gate-authority/src/lib.rs
// ============================================================================
// Module: Agent Gate Authority Library
// Description: HTTP implementations of the identity, policy, and audit interfaces.
// Purpose: Connect the enforcement runtime to a remote authority service.
// Dependencies: agent-gate-core, reqwest
// ============================================================================

//! ## Overview
//! `agent-gate-authority` provides [`HttpAuthorityClient`], a single
//! connection-pooled client that registers agents, issues single-use
//! credentials, evaluates policies, and forwards audit records.
//!
//! Security posture: authority responses are untrusted and parsed strictly;
//! anything that is not a well-formed decision is reported as an error so the
//! gate denies.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::ClientBuildError;
pub use http::HttpAuthorityClient;
