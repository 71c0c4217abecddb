// crates/agent-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Policy Enforcement Gate
// Description: Per-call identity resolution, credential issuance, and policy checks.
// Purpose: Allow or block tool calls based on external policy decisions.
// Dependencies: crate::{core, interfaces, runtime}, tokio, tracing
// ============================================================================

//! ## Overview
//! [`PolicyGate::enforce`] runs the enforcement pipeline for one call in a
//! fixed order: client lookup, agent resolution, credential issuance, context
//! construction, policy resolution, evaluation, audit, then the outcome.
//! Every stage that talks to an authority is bounded by a timeout, and every
//! failure blocks the call.
//!
//! [`PolicyGate::guard`] wraps a [`Tool`] in a [`GuardedTool`] that runs the
//! pipeline before delegating. The wrapper keeps the tool's argument and
//! output types, and its context builder is checked against the tool's
//! declared parameters at wrap time.
//!
//! Security posture: fail closed. A call runs only after the policy
//! authority returned `allow = true` for a credential issued to this call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::Agent;
use crate::core::AuditRecord;
use crate::core::AuditRecordParams;
use crate::core::ClientIdentity;
use crate::core::PolicyDecision;
use crate::core::PolicyId;
use crate::interfaces::AuditSink;
use crate::interfaces::IdentityAuthority;
use crate::interfaces::NoopAuditSink;
use crate::interfaces::PolicyAuthority;
use crate::interfaces::PolicyRequest;
use crate::runtime::context::ContextBuilder;
use crate::runtime::directory::AgentDirectory;
use crate::runtime::error::ConfigurationError;
use crate::runtime::error::EnforcementError;
use crate::runtime::extractor::ClientInfoStore;
use crate::runtime::tool::CallScope;
use crate::runtime::tool::Tool;
use crate::runtime::tool::ToolError;
use crate::runtime::tool::ToolSignature;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name used in default resource URIs.
pub const DEFAULT_SERVER_NAME: &str = "agent-gate";
/// Default registration timeout in milliseconds.
pub const DEFAULT_REGISTRATION_TIMEOUT_MS: u64 = 10_000;
/// Default credential issuance timeout in milliseconds.
pub const DEFAULT_CREDENTIAL_TIMEOUT_MS: u64 = 10_000;
/// Default policy evaluation timeout in milliseconds.
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 10_000;
/// Default audit delivery timeout in milliseconds.
pub const DEFAULT_AUDIT_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-stage timeouts for authority calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementTimeouts {
    /// Agent registration (cache miss only).
    pub registration: Duration,
    /// Credential issuance.
    pub credential: Duration,
    /// Policy evaluation.
    pub evaluation: Duration,
    /// Audit delivery.
    pub audit: Duration,
}

impl Default for EnforcementTimeouts {
    fn default() -> Self {
        Self {
            registration: Duration::from_millis(DEFAULT_REGISTRATION_TIMEOUT_MS),
            credential: Duration::from_millis(DEFAULT_CREDENTIAL_TIMEOUT_MS),
            evaluation: Duration::from_millis(DEFAULT_EVALUATION_TIMEOUT_MS),
            audit: Duration::from_millis(DEFAULT_AUDIT_TIMEOUT_MS),
        }
    }
}

/// How audit records reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditDelivery {
    /// Spawn delivery so the decision path does not wait on the sink.
    #[default]
    Detached,
    /// Await delivery before returning the outcome.
    ///
    /// The decision's return path waits on the sink for up to the audit
    /// timeout. Sink failures are still logged and never change the outcome.
    /// Use this mode when records must be durable before the tool result is
    /// observed, such as in tests or with a local file sink.
    Inline,
}

/// Stages of the per-call enforcement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementStage {
    /// Call received.
    Start,
    /// Agent resolved for the caller.
    IdentityResolved,
    /// Single-use credential issued.
    CredentialObtained,
    /// Enforcement context built.
    ContextBuilt,
    /// Policy decision received.
    DecisionReceived,
    /// Policy allowed the call.
    Allowed,
    /// Policy denied the call.
    Denied,
}

impl EnforcementStage {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::IdentityResolved => "identity_resolved",
            Self::CredentialObtained => "credential_obtained",
            Self::ContextBuilt => "context_built",
            Self::DecisionReceived => "decision_received",
            Self::Allowed => "allowed",
            Self::Denied => "denied",
        }
    }
}

/// Tool-level inputs to one enforcement call.
#[derive(Debug, Clone, Copy)]
pub struct EnforcementTarget<'a> {
    /// Signature of the tool being called.
    pub tool: &'a ToolSignature,
    /// Per-tool policy override.
    pub policy_id: Option<&'a PolicyId>,
    /// Resource override.
    pub resource: Option<&'a str>,
}

impl<'a> EnforcementTarget<'a> {
    /// Creates a target with no overrides.
    #[must_use]
    pub const fn new(tool: &'a ToolSignature) -> Self {
        Self {
            tool,
            policy_id: None,
            resource: None,
        }
    }
}

/// Successful enforcement outcome.
#[derive(Debug, Clone)]
pub struct Authorization {
    /// Agent the call was authorized for.
    pub agent: Arc<Agent>,
    /// Policy that allowed the call.
    pub policy_id: PolicyId,
    /// Decision returned by the policy authority.
    pub decision: PolicyDecision,
}

/// Options for guarding a tool.
pub struct GuardOptions<A> {
    /// Context builder for the tool's arguments.
    pub context: ContextBuilder<A>,
    /// Per-tool policy override.
    pub policy_id: Option<PolicyId>,
    /// Resource override.
    pub resource: Option<String>,
}

impl<A> GuardOptions<A> {
    /// Creates options with no overrides.
    #[must_use]
    pub const fn new(context: ContextBuilder<A>) -> Self {
        Self {
            context,
            policy_id: None,
            resource: None,
        }
    }

    /// Sets the per-tool policy override.
    #[must_use]
    pub fn with_policy(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = Some(policy_id);
        self
    }

    /// Sets the resource override.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

// ============================================================================
// SECTION: Policy Gate
// ============================================================================

/// Shared gate state.
struct GateInner {
    /// Connection-keyed client metadata.
    client_info: ClientInfoStore,
    /// Signature-keyed agent cache.
    directory: Arc<AgentDirectory>,
    /// Identity authority.
    identity: Arc<dyn IdentityAuthority>,
    /// Policy authority.
    policy: Arc<dyn PolicyAuthority>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Fallback policy when a tool has no override.
    default_policy_id: Option<PolicyId>,
    /// Server name used in default resource URIs.
    server_name: String,
    /// Resource prefix replacing the default URI prefix.
    resource_prefix: Option<String>,
    /// Stage timeouts.
    timeouts: EnforcementTimeouts,
    /// Audit delivery mode.
    audit_delivery: AuditDelivery,
}

/// Policy enforcement gate.
///
/// # Invariants
/// - Cloning shares the same directory, stores, and authorities.
/// - Never caches credentials or decisions.
#[derive(Clone)]
pub struct PolicyGate {
    /// Shared state.
    inner: Arc<GateInner>,
}

impl PolicyGate {
    /// Starts building a gate around the given authorities.
    #[must_use]
    pub fn builder(
        identity: Arc<dyn IdentityAuthority>,
        policy: Arc<dyn PolicyAuthority>,
    ) -> PolicyGateBuilder {
        PolicyGateBuilder::new(identity, policy)
    }

    /// Returns the connection-keyed client metadata store.
    #[must_use]
    pub fn client_info(&self) -> &ClientInfoStore {
        &self.inner.client_info
    }

    /// Returns the agent directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.inner.directory
    }

    /// Returns the process-wide default policy.
    #[must_use]
    pub fn default_policy_id(&self) -> Option<&PolicyId> {
        self.inner.default_policy_id.as_ref()
    }

    /// Wraps a tool so every call is enforced before it runs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ContextBuilderMismatch`] when the
    /// context builder's parameters differ from the tool's.
    pub fn guard<T: Tool>(
        &self,
        tool: T,
        options: GuardOptions<T::Args>,
    ) -> Result<GuardedTool<T>, ConfigurationError> {
        options.context.check_signature(tool.signature())?;
        tracing::debug!(
            tool = %tool.signature().name,
            policy_override = options.policy_id.is_some(),
            "tool guarded"
        );
        Ok(GuardedTool {
            inner: tool,
            gate: self.clone(),
            options,
        })
    }

    /// Resolves the agent for the calling connection, registering if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when no client metadata was captured or
    /// registration fails.
    pub async fn current_agent(&self, scope: &CallScope) -> Result<Arc<Agent>, EnforcementError> {
        let identity = self.client_identity(scope)?;
        self.resolve_agent(&identity).await
    }

    /// Runs the enforcement pipeline for one call.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] when the policy denies the
    /// call, and another [`EnforcementError`] variant when no decision could
    /// be reached.
    pub async fn enforce<A: Sync>(
        &self,
        scope: &CallScope,
        target: EnforcementTarget<'_>,
        args: &A,
        context: &ContextBuilder<A>,
    ) -> Result<Authorization, EnforcementError> {
        let result = self.run_pipeline(scope, target, args, context).await;
        if let Err(err) = &result {
            log_failure(scope, target.tool, err);
        }
        result
    }

    /// Pipeline body; stages run strictly in order.
    async fn run_pipeline<A: Sync>(
        &self,
        scope: &CallScope,
        target: EnforcementTarget<'_>,
        args: &A,
        context: &ContextBuilder<A>,
    ) -> Result<Authorization, EnforcementError> {
        let tool = target.tool;
        trace_stage(scope, tool, EnforcementStage::Start);

        let identity = self.client_identity(scope)?;
        let agent = self.resolve_agent(&identity).await?;
        trace_stage(scope, tool, EnforcementStage::IdentityResolved);

        let credential = bounded(
            self.inner.timeouts.credential,
            self.inner.identity.issue_credential(&agent),
        )
        .await
        .map_err(EnforcementError::Credential)?
        .map_err(|err| EnforcementError::Credential(err.to_string()))?;
        trace_stage(scope, tool, EnforcementStage::CredentialObtained);

        context.check_signature(tool)?;
        let context = context.build(tool, args)?.with_agent(&agent);
        trace_stage(scope, tool, EnforcementStage::ContextBuilt);

        let policy_id = self.resolve_policy(target)?;
        let request = PolicyRequest {
            policy_id,
            action: tool.name.clone(),
            resource: self.resource_for(target),
            context,
        };
        let evaluation = self.inner.policy.evaluate(&request, credential);
        let decision = bounded(self.inner.timeouts.evaluation, evaluation)
            .await
            .map_err(EnforcementError::PolicyEvaluation)?
            .map_err(|err| EnforcementError::PolicyEvaluation(err.to_string()))?;
        trace_stage(scope, tool, EnforcementStage::DecisionReceived);

        let PolicyRequest {
            policy_id,
            action,
            resource,
            context,
        } = request;
        self.emit_audit(AuditRecord::new(AuditRecordParams {
            agent_id: agent.agent_id.clone(),
            action,
            resource,
            policy_id: policy_id.clone(),
            context,
            decision: decision.clone(),
            identity_tier: agent.metadata.tier,
            request_id: scope.request_id.clone(),
        }))
        .await;

        if decision.allow {
            trace_stage(scope, tool, EnforcementStage::Allowed);
            return Ok(Authorization {
                agent,
                policy_id,
                decision,
            });
        }
        trace_stage(scope, tool, EnforcementStage::Denied);
        Err(EnforcementError::AccessDenied {
            reason: decision.reason.unwrap_or_else(|| "denied by policy".to_string()),
        })
    }

    /// Reads the client identity captured for the calling connection.
    fn client_identity(&self, scope: &CallScope) -> Result<ClientIdentity, ConfigurationError> {
        self.inner.client_info.get(&scope.connection_id).ok_or_else(|| {
            ConfigurationError::MissingClientInfo {
                connection_id: scope.connection_id.clone(),
            }
        })
    }

    /// Returns the cached agent or registers it within the registration timeout.
    async fn resolve_agent(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Arc<Agent>, EnforcementError> {
        let registration =
            self.inner.directory.get_or_register(identity, self.inner.identity.as_ref());
        let agent = bounded(self.inner.timeouts.registration, registration)
            .await
            .map_err(EnforcementError::Registration)??;
        Ok(agent)
    }

    /// Resolves the per-tool override, then the default policy.
    fn resolve_policy(
        &self,
        target: EnforcementTarget<'_>,
    ) -> Result<PolicyId, ConfigurationError> {
        target.policy_id.or(self.inner.default_policy_id.as_ref()).cloned().ok_or_else(|| {
            ConfigurationError::MissingPolicy {
                tool: target.tool.name.clone(),
            }
        })
    }

    /// Returns the resource override or the derived tool URI.
    fn resource_for(&self, target: EnforcementTarget<'_>) -> String {
        if let Some(resource) = target.resource {
            return resource.to_string();
        }
        match &self.inner.resource_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), target.tool.name),
            None => format!("mcp://{}/tools/{}", self.inner.server_name, target.tool.name),
        }
    }

    /// Hands the record to the audit sink per the delivery mode.
    async fn emit_audit(&self, record: AuditRecord) {
        let sink = Arc::clone(&self.inner.audit);
        let limit = self.inner.timeouts.audit;
        match (self.inner.audit_delivery, tokio::runtime::Handle::try_current()) {
            (AuditDelivery::Detached, Ok(handle)) => {
                drop(handle.spawn(deliver_audit(sink, record, limit)));
            }
            _ => deliver_audit(sink, record, limit).await,
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`PolicyGate`].
pub struct PolicyGateBuilder {
    /// Identity authority.
    identity: Arc<dyn IdentityAuthority>,
    /// Policy authority.
    policy: Arc<dyn PolicyAuthority>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Client metadata store.
    client_info: ClientInfoStore,
    /// Agent directory.
    directory: Arc<AgentDirectory>,
    /// Default policy.
    default_policy_id: Option<PolicyId>,
    /// Server name for resource URIs.
    server_name: String,
    /// Resource prefix override.
    resource_prefix: Option<String>,
    /// Stage timeouts.
    timeouts: EnforcementTimeouts,
    /// Audit delivery mode.
    audit_delivery: AuditDelivery,
}

impl PolicyGateBuilder {
    /// Creates a builder with an empty store, a fresh directory, and no audit.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityAuthority>, policy: Arc<dyn PolicyAuthority>) -> Self {
        Self {
            identity,
            policy,
            audit: Arc::new(NoopAuditSink),
            client_info: ClientInfoStore::new(),
            directory: Arc::new(AgentDirectory::new()),
            default_policy_id: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            resource_prefix: None,
            timeouts: EnforcementTimeouts::default(),
            audit_delivery: AuditDelivery::default(),
        }
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Shares an existing client metadata store.
    #[must_use]
    pub fn client_info(mut self, client_info: ClientInfoStore) -> Self {
        self.client_info = client_info;
        self
    }

    /// Shares an existing agent directory.
    #[must_use]
    pub fn directory(mut self, directory: Arc<AgentDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Sets the default policy.
    #[must_use]
    pub fn default_policy_id(mut self, policy_id: PolicyId) -> Self {
        self.default_policy_id = Some(policy_id);
        self
    }

    /// Sets the server name used in default resource URIs.
    #[must_use]
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    /// Replaces the `mcp://{server}/tools` resource prefix.
    #[must_use]
    pub fn resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = Some(prefix.into());
        self
    }

    /// Sets the stage timeouts.
    #[must_use]
    pub fn timeouts(mut self, timeouts: EnforcementTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the audit delivery mode.
    #[must_use]
    pub fn audit_delivery(mut self, delivery: AuditDelivery) -> Self {
        self.audit_delivery = delivery;
        self
    }

    /// Builds the gate.
    #[must_use]
    pub fn build(self) -> PolicyGate {
        PolicyGate {
            inner: Arc::new(GateInner {
                client_info: self.client_info,
                directory: self.directory,
                identity: self.identity,
                policy: self.policy,
                audit: self.audit,
                default_policy_id: self.default_policy_id,
                server_name: self.server_name,
                resource_prefix: self.resource_prefix,
                timeouts: self.timeouts,
                audit_delivery: self.audit_delivery,
            }),
        }
    }
}

// ============================================================================
// SECTION: Guarded Tool
// ============================================================================

/// Tool wrapper that enforces policy before delegating.
pub struct GuardedTool<T: Tool> {
    /// Wrapped tool.
    inner: T,
    /// Gate running the pipeline.
    gate: PolicyGate,
    /// Context builder and overrides.
    options: GuardOptions<T::Args>,
}

impl<T: Tool> GuardedTool<T> {
    /// Returns the wrapped tool.
    #[must_use]
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    /// Returns the per-tool policy override.
    #[must_use]
    pub const fn policy_id(&self) -> Option<&PolicyId> {
        self.options.policy_id.as_ref()
    }
}

#[async_trait]
impl<T: Tool> Tool for GuardedTool<T> {
    type Args = T::Args;
    type Output = T::Output;

    fn signature(&self) -> &ToolSignature {
        self.inner.signature()
    }

    async fn call(&self, scope: &CallScope, args: T::Args) -> Result<T::Output, ToolError> {
        let target = EnforcementTarget {
            tool: self.inner.signature(),
            policy_id: self.options.policy_id.as_ref(),
            resource: self.options.resource.as_deref(),
        };
        self.gate.enforce(scope, target, &args, &self.options.context).await?;
        self.inner.call(scope, args).await
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Awaits `future` within `limit`, reporting a timeout as a message.
async fn bounded<F: Future>(limit: Duration, future: F) -> Result<F::Output, String> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| format!("timed out after {} ms", limit.as_millis()))
}

/// Delivers one audit record; failures are logged and dropped.
async fn deliver_audit(sink: Arc<dyn AuditSink>, record: AuditRecord, limit: Duration) {
    match bounded(limit, sink.record(&record)).await {
        Ok(Ok(())) => {
            tracing::debug!(agent_id = %record.agent_id, action = %record.action, "audit recorded");
        }
        Ok(Err(err)) => {
            tracing::warn!(
                agent_id = %record.agent_id,
                action = %record.action,
                error = %err,
                "audit emission failed"
            );
        }
        Err(message) => {
            tracing::warn!(
                agent_id = %record.agent_id,
                action = %record.action,
                error = %message,
                "audit emission failed"
            );
        }
    }
}

/// Logs one stage transition.
fn trace_stage(scope: &CallScope, tool: &ToolSignature, stage: EnforcementStage) {
    tracing::debug!(
        connection_id = %scope.connection_id,
        tool = %tool.name,
        stage = stage.as_str(),
        "enforcement stage"
    );
}

/// Logs a pipeline failure at the level matching its class.
fn log_failure(scope: &CallScope, tool: &ToolSignature, err: &EnforcementError) {
    if let EnforcementError::AccessDenied {
        reason,
    } = err
    {
        tracing::info!(
            connection_id = %scope.connection_id,
            tool = %tool.name,
            reason = %reason,
            "call denied by policy"
        );
        return;
    }
    tracing::warn!(
        connection_id = %scope.connection_id,
        tool = %tool.name,
        kind = err.kind(),
        error = %err,
        "enforcement failed"
    );
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
