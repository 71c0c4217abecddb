// crates/agent-gate-core/src/runtime/tool.rs
// ============================================================================
// Module: Tool Surface
// Description: Typed tool trait, call scope, and closure-backed tools.
// Purpose: Give guarded and unguarded tools one callable shape.
// Dependencies: crate::{core, runtime}, async-trait, thiserror
// ============================================================================

//! ## Overview
//! A [`Tool`] is an async callable with typed arguments and output and a
//! declared [`ToolSignature`]. Every call carries a [`CallScope`] naming the
//! connection it arrived on, which is how enforcement finds the caller's
//! client metadata. Guarding a tool yields another [`Tool`] with the same
//! argument and output types, so callers cannot tell the two apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::ConnectionId;
use crate::core::ToolName;
use crate::runtime::error::EnforcementError;

// ============================================================================
// SECTION: Call Scope
// ============================================================================

/// Per-call transport context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallScope {
    /// Connection the call arrived on.
    pub connection_id: ConnectionId,
    /// Transport request identifier, when available.
    pub request_id: Option<String>,
}

impl CallScope {
    /// Creates a scope for a connection.
    #[must_use]
    pub fn new(connection_id: impl Into<ConnectionId>) -> Self {
        Self {
            connection_id: connection_id.into(),
            request_id: None,
        }
    }

    /// Attaches a transport request identifier.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Tool Signature
// ============================================================================

/// Declared tool name and ordered parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSignature {
    /// Tool name, used as the policy action.
    pub name: ToolName,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
}

impl ToolSignature {
    /// Creates a tool signature.
    #[must_use]
    pub fn new<I, S>(name: impl Into<ToolName>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool invocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Enforcement blocked the call before the tool body ran.
    #[error(transparent)]
    Enforcement(#[from] EnforcementError),
    /// Arguments could not be decoded for the tool.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The tool body failed.
    #[error("tool failed: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: Tool Trait
// ============================================================================

/// Async callable exposed to agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Typed arguments.
    type Args: Send + Sync + 'static;
    /// Typed output.
    type Output: Send + 'static;

    /// Returns the declared signature.
    fn signature(&self) -> &ToolSignature;

    /// Invokes the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the call is blocked or the tool fails.
    async fn call(&self, scope: &CallScope, args: Self::Args) -> Result<Self::Output, ToolError>;
}

// ============================================================================
// SECTION: Closure Tools
// ============================================================================

/// Tool backed by an async closure.
pub struct FnTool<A, O, F, Fut> {
    /// Declared signature.
    signature: ToolSignature,
    /// Tool body.
    handler: F,
    /// Argument, output, and future types.
    _types: PhantomData<fn(A) -> (O, Fut)>,
}

impl<A, O, F, Fut> fmt::Debug for FnTool<A, O, F, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool").field("signature", &self.signature).finish_non_exhaustive()
    }
}

/// Builds a tool from a signature and an async closure.
///
/// The closure receives an owned copy of the call scope.
#[must_use]
pub fn tool_fn<A, O, F, Fut>(signature: ToolSignature, handler: F) -> FnTool<A, O, F, Fut>
where
    F: Fn(CallScope, A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send,
{
    FnTool {
        signature,
        handler,
        _types: PhantomData,
    }
}

#[async_trait]
impl<A, O, F, Fut> Tool for FnTool<A, O, F, Fut>
where
    A: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(CallScope, A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send,
{
    type Args = A;
    type Output = O;

    fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    async fn call(&self, scope: &CallScope, args: A) -> Result<O, ToolError> {
        (self.handler)(scope.clone(), args).await
    }
}
