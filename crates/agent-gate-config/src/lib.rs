// crates/agent-gate-config/src/lib.rs
// ============================================================================
// Module: Agent Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for agent-gate.toml semantics.
// Dependencies: agent-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `agent-gate-config` defines the configuration model for an Agent Gate
//! host: transport, authority connection, default policy, stage timeouts,
//! audit sink, and logging. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
