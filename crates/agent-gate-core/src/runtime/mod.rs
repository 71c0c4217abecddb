// crates/agent-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Agent Gate Runtime
// Description: Signature extraction, agent directory, and policy enforcement.
// Purpose: Execute the per-call enforcement pipeline against external authorities.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the enforcement call path: the extractor turns
//! handshakes into client identities, the directory memoizes one agent per
//! signature, and the gate runs every guarded call through the policy
//! authority before the tool body executes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod context;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod tool;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::ContextBuilder;
pub use directory::AgentDirectory;
pub use error::ConfigurationError;
pub use error::DirectoryError;
pub use error::EnforcementError;
pub use error::ErrorClass;
pub use extractor::ClientInfoStore;
pub use extractor::capture_client_info;
pub use extractor::extract_client_identity;
pub use gate::AuditDelivery;
pub use gate::Authorization;
pub use gate::EnforcementStage;
pub use gate::EnforcementTarget;
pub use gate::EnforcementTimeouts;
pub use gate::GuardOptions;
pub use gate::GuardedTool;
pub use gate::PolicyGate;
pub use gate::PolicyGateBuilder;
pub use tool::CallScope;
pub use tool::FnTool;
pub use tool::Tool;
pub use tool::ToolError;
pub use tool::ToolSignature;
pub use tool::tool_fn;
