// crates/agent-gate-core/src/runtime/context.rs
// ============================================================================
// Module: Context Builders
// Description: Declared mappings from tool arguments to enforcement context.
// Purpose: Build caller-defined policy context with a checked parameter contract.
// Dependencies: crate::{core, runtime}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ContextBuilder`] pairs a mapping function with the parameter names it
//! reads. The names are compared against the wrapped tool's declared
//! parameters when the tool is guarded, so a builder written for a different
//! signature is rejected before any call is served.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::EnforcementContext;
use crate::runtime::error::ConfigurationError;
use crate::runtime::tool::ToolSignature;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Mapping function from tool arguments to context entries.
type BuildFn<A> = dyn Fn(&A) -> Result<Map<String, Value>, String> + Send + Sync;

/// Declared mapping from tool arguments to an enforcement context.
///
/// # Invariants
/// - `params` lists the tool parameters the builder reads, in tool order.
pub struct ContextBuilder<A> {
    /// Declared parameter names.
    params: Vec<String>,
    /// Mapping function.
    build: Arc<BuildFn<A>>,
}

impl<A> Clone for ContextBuilder<A> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            build: Arc::clone(&self.build),
        }
    }
}

impl<A> fmt::Debug for ContextBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder").field("params", &self.params).finish_non_exhaustive()
    }
}

impl<A> ContextBuilder<A> {
    /// Creates a builder from an infallible mapping function.
    #[must_use]
    pub fn new<I, S, F>(params: I, build: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&A) -> Map<String, Value> + Send + Sync + 'static,
    {
        Self::try_new(params, move |args| Ok(build(args)))
    }

    /// Creates a builder from a fallible mapping function.
    #[must_use]
    pub fn try_new<I, S, F>(params: I, build: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&A) -> Result<Map<String, Value>, String> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            build: Arc::new(build),
        }
    }

    /// Returns the declared parameter names.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Builds the caller portion of the enforcement context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ContextBuild`] when the mapping fails.
    pub fn build(
        &self,
        signature: &ToolSignature,
        args: &A,
    ) -> Result<EnforcementContext, ConfigurationError> {
        (self.build)(args).map(EnforcementContext::from_map).map_err(|message| {
            ConfigurationError::ContextBuild {
                tool: signature.name.clone(),
                message,
            }
        })
    }

    /// Checks the declared parameters against the tool signature.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ContextBuilderMismatch`] when the names
    /// or their order differ.
    pub fn check_signature(&self, signature: &ToolSignature) -> Result<(), ConfigurationError> {
        if self.params == signature.params {
            return Ok(());
        }
        Err(ConfigurationError::ContextBuilderMismatch {
            tool: signature.name.clone(),
            expected: signature.params.clone(),
            declared: self.params.clone(),
        })
    }
}

impl<A: Serialize> ContextBuilder<A> {
    /// Creates a builder that copies the named argument fields verbatim.
    ///
    /// The arguments must serialize to a JSON object. Missing fields are
    /// copied as `null`.
    #[must_use]
    pub fn passthrough<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let keys = params.clone();
        Self::try_new(params, move |args: &A| {
            let value = serde_json::to_value(args).map_err(|err| err.to_string())?;
            let Value::Object(mut fields) = value else {
                return Err("arguments did not serialize to an object".to_string());
            };
            Ok(keys
                .iter()
                .map(|key| (key.clone(), fields.remove(key).unwrap_or(Value::Null)))
                .collect())
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
