// crates/agent-gate-mcp/src/setup.rs
// ============================================================================
// Module: Gate Setup
// Description: Wires the client signature extractor and policy gate into a host.
// Purpose: Provide the single entry point that installs enforcement.
// Dependencies: agent-gate-core, agent-gate-config, agent-gate-authority
// ============================================================================

//! ## Overview
//! [`setup`] installs a connection hook that captures client metadata on
//! `initialize` (and drops it when the connection closes), then returns the
//! [`PolicyGate`] used to guard tools. [`setup_from_config`] builds the
//! authorities and audit sink from [`AgentGateConfig`] first.
//!
//! A default policy id is required; setup fails closed without one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use agent_gate_authority::HttpAuthorityClient;
use agent_gate_config::AgentGateConfig;
use agent_gate_config::AuditSinkKind;
use agent_gate_core::AgentDirectory;
use agent_gate_core::AuditDelivery;
use agent_gate_core::AuditSink;
use agent_gate_core::ClientHandshake;
use agent_gate_core::ClientInfoStore;
use agent_gate_core::ConnectionId;
use agent_gate_core::EnforcementTimeouts;
use agent_gate_core::IdentityAuthority;
use agent_gate_core::NoopAuditSink;
use agent_gate_core::PolicyAuthority;
use agent_gate_core::PolicyGate;
use agent_gate_core::PolicyId;
use agent_gate_core::capture_client_info;
use thiserror::Error;

use crate::audit::FileAuditSink;
use crate::audit::TracingAuditSink;
use crate::server::ConnectionHook;
use crate::server::McpHost;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Setup failures. Enforcement is not installed when setup fails.
#[derive(Debug, Error)]
pub enum SetupError {
    /// No default policy id was supplied.
    #[error("default policy id is required")]
    MissingDefaultPolicy,
    /// Configuration could not be applied.
    #[error("setup config error: {0}")]
    Config(String),
    /// Authority client could not be built.
    #[error("authority client error: {0}")]
    Authority(String),
    /// Audit sink could not be opened.
    #[error("audit sink error: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// Inputs for [`setup`].
///
/// Unset stores and sinks default to fresh instances and a no-op sink.
pub struct SetupParams<'a> {
    /// Host receiving the initialize hook.
    pub host: &'a mut McpHost,
    /// Identity authority.
    pub identity: Arc<dyn IdentityAuthority>,
    /// Policy authority.
    pub policy: Arc<dyn PolicyAuthority>,
    /// Audit sink.
    pub audit: Option<Arc<dyn AuditSink>>,
    /// Shared client metadata store.
    pub client_info: Option<ClientInfoStore>,
    /// Shared agent directory.
    pub directory: Option<Arc<AgentDirectory>>,
    /// Default policy. Required.
    pub default_policy_id: Option<PolicyId>,
    /// Resource prefix override.
    pub resource_prefix: Option<String>,
    /// Stage timeouts.
    pub timeouts: EnforcementTimeouts,
    /// Audit delivery mode.
    pub audit_delivery: AuditDelivery,
}

impl<'a> SetupParams<'a> {
    /// Creates parameters with defaults for everything but the authorities.
    #[must_use]
    pub fn new(
        host: &'a mut McpHost,
        identity: Arc<dyn IdentityAuthority>,
        policy: Arc<dyn PolicyAuthority>,
    ) -> Self {
        Self {
            host,
            identity,
            policy,
            audit: None,
            client_info: None,
            directory: None,
            default_policy_id: None,
            resource_prefix: None,
            timeouts: EnforcementTimeouts::default(),
            audit_delivery: AuditDelivery::default(),
        }
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Shares an existing client metadata store.
    #[must_use]
    pub fn client_info(mut self, client_info: ClientInfoStore) -> Self {
        self.client_info = Some(client_info);
        self
    }

    /// Shares an existing agent directory.
    #[must_use]
    pub fn directory(mut self, directory: Arc<AgentDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the default policy.
    #[must_use]
    pub fn default_policy_id(mut self, policy_id: PolicyId) -> Self {
        self.default_policy_id = Some(policy_id);
        self
    }

    /// Sets the resource prefix override.
    #[must_use]
    pub fn resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = Some(prefix.into());
        self
    }

    /// Sets the stage timeouts.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: EnforcementTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the audit delivery mode.
    #[must_use]
    pub const fn audit_delivery(mut self, delivery: AuditDelivery) -> Self {
        self.audit_delivery = delivery;
        self
    }
}

// ============================================================================
// SECTION: Extractor Hook
// ============================================================================

/// Connection hook feeding the client signature extractor.
struct ClientInfoHook {
    /// Store shared with the gate.
    store: ClientInfoStore,
}

impl ConnectionHook for ClientInfoHook {
    fn initialized(&self, connection_id: &ConnectionId, handshake: &ClientHandshake) {
        capture_client_info(&self.store, connection_id, handshake);
    }

    fn closed(&self, connection_id: &ConnectionId) {
        self.store.remove(connection_id);
    }
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Installs the extractor into the host and returns the configured gate.
///
/// # Errors
///
/// Returns [`SetupError::MissingDefaultPolicy`] when no default policy id
/// was supplied.
pub fn setup(params: SetupParams<'_>) -> Result<PolicyGate, SetupError> {
    let SetupParams {
        host,
        identity,
        policy,
        audit,
        client_info,
        directory,
        default_policy_id,
        resource_prefix,
        timeouts,
        audit_delivery,
    } = params;
    let default_policy_id = default_policy_id.ok_or(SetupError::MissingDefaultPolicy)?;
    let client_info = client_info.unwrap_or_default();

    let mut builder = PolicyGate::builder(identity, policy)
        .client_info(client_info.clone())
        .default_policy_id(default_policy_id.clone())
        .server_name(host.name())
        .timeouts(timeouts)
        .audit_delivery(audit_delivery);
    if let Some(audit) = audit {
        builder = builder.audit(audit);
    }
    if let Some(directory) = directory {
        builder = builder.directory(directory);
    }
    if let Some(prefix) = resource_prefix {
        builder = builder.resource_prefix(prefix);
    }

    host.add_connection_hook(Arc::new(ClientInfoHook {
        store: client_info,
    }));
    tracing::info!(
        server = %host.name(),
        default_policy_id = %default_policy_id,
        "policy gate installed"
    );
    Ok(builder.build())
}

/// Builds authorities and the audit sink from configuration, then runs
/// [`setup`].
///
/// # Errors
///
/// Returns [`SetupError`] when the API key, authority client, audit sink, or
/// default policy cannot be resolved.
pub fn setup_from_config(
    host: &mut McpHost,
    config: &AgentGateConfig,
) -> Result<PolicyGate, SetupError> {
    let authority = &config.authority;
    let api_key = authority.resolve_api_key().map_err(|err| SetupError::Config(err.to_string()))?;
    let client = Arc::new(
        HttpAuthorityClient::new(
            &authority.base_url,
            api_key.as_deref(),
            authority.connect_timeout(),
            authority.request_timeout(),
        )
        .map_err(|err| SetupError::Authority(err.to_string()))?,
    );
    let audit: Arc<dyn AuditSink> = match config.audit.sink {
        AuditSinkKind::Authority => Arc::clone(&client) as Arc<dyn AuditSink>,
        AuditSinkKind::File => {
            let path = config
                .audit
                .path
                .as_deref()
                .ok_or_else(|| SetupError::Config("audit.path is required".to_string()))?;
            let sink = FileAuditSink::open(Path::new(path))
                .map_err(|err| SetupError::Audit(format!("{path}: {err}")))?;
            Arc::new(sink)
        }
        AuditSinkKind::Tracing => Arc::new(TracingAuditSink),
        AuditSinkKind::None => Arc::new(NoopAuditSink),
    };
    let default_policy_id =
        config.policy.default_policy_id().map_err(|err| SetupError::Config(err.to_string()))?;

    let mut params = SetupParams::new(
        host,
        Arc::clone(&client) as Arc<dyn IdentityAuthority>,
        client as Arc<dyn PolicyAuthority>,
    )
    .audit(audit)
    .default_policy_id(default_policy_id)
    .timeouts(config.enforcement.timeouts())
    .audit_delivery(config.audit.delivery());
    if let Some(prefix) = &config.policy.resource_prefix {
        params = params.resource_prefix(prefix.trim());
    }
    setup(params)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
