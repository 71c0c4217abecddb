// crates/agent-gate-core/src/lib.rs
// ============================================================================
// Module: Agent Gate Core Library
// Description: Public API surface for the Agent Gate core.
// Purpose: Expose core types, authority interfaces, and the enforcement runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Agent Gate core binds each calling client to a durable agent identity and
//! gates tool execution behind an externally evaluated policy. It holds only
//! in-memory, process-lifetime state and reaches the identity authority,
//! policy authority, and audit sink through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditError;
pub use interfaces::AuditSink;
pub use interfaces::AuthorityError;
pub use interfaces::IdentityAuthority;
pub use interfaces::NoopAuditSink;
pub use interfaces::PolicyAuthority;
pub use interfaces::PolicyRequest;
pub use interfaces::RegisteredAgent;
pub use interfaces::RegistrationRequest;
pub use interfaces::SingleUseCredential;
pub use runtime::AgentDirectory;
pub use runtime::AuditDelivery;
pub use runtime::Authorization;
pub use runtime::CallScope;
pub use runtime::ClientInfoStore;
pub use runtime::ConfigurationError;
pub use runtime::ContextBuilder;
pub use runtime::DirectoryError;
pub use runtime::EnforcementError;
pub use runtime::EnforcementStage;
pub use runtime::EnforcementTarget;
pub use runtime::EnforcementTimeouts;
pub use runtime::ErrorClass;
pub use runtime::FnTool;
pub use runtime::GuardOptions;
pub use runtime::GuardedTool;
pub use runtime::PolicyGate;
pub use runtime::PolicyGateBuilder;
pub use runtime::Tool;
pub use runtime::ToolError;
pub use runtime::ToolSignature;
pub use runtime::capture_client_info;
pub use runtime::extract_client_identity;
pub use runtime::tool_fn;
