// crates/agent-gate-core/src/core/mod.rs
// ============================================================================
// Module: Agent Gate Core Types
// Description: Identifiers, client metadata, agents, context, and decisions.
// Purpose: Group the data model shared by runtime and interfaces.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! The core data model. Types here hold no behavior beyond construction and
//! accessors; enforcement lives in [`crate::runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent;
pub mod client;
pub mod context;
pub mod decision;
pub mod identifiers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agent::Agent;
pub use agent::Timestamp;
pub use client::ClientHandshake;
pub use client::ClientIdentity;
pub use client::ClientMetadata;
pub use client::IdentityTier;
pub use client::PLACEHOLDER_IDENTITY;
pub use context::CONTEXT_AGENT_ID;
pub use context::CONTEXT_AGENT_NAME;
pub use context::CONTEXT_CAPABILITIES;
pub use context::CONTEXT_IDENTITY_TIER;
pub use context::EnforcementContext;
pub use decision::AuditRecord;
pub use decision::AuditRecordParams;
pub use decision::PolicyDecision;
pub use identifiers::AgentId;
pub use identifiers::ClientSignature;
pub use identifiers::ConnectionId;
pub use identifiers::PolicyId;
pub use identifiers::SIGNATURE_SEPARATOR;
pub use identifiers::ToolName;
