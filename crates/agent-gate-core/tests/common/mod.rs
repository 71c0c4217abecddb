// crates/agent-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Fake authorities, recording audit sinks, and gate helpers.
// Purpose: Provide reusable, deterministic collaborators for enforcement tests.
// Dependencies: agent-gate-core, tokio
// ============================================================================

//! ## Overview
//! [`FakeAuthority`] plays both identity and policy authority. It counts
//! registrations, hands out numbered credentials, records every evaluation
//! request with the credential that backed it, and supports failure and
//! latency injection per stage.
//!
//! Security posture: fixtures exercise fail-closed paths by injecting
//! failures at each external boundary.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use agent_gate_core::Agent;
use agent_gate_core::AuditDelivery;
use agent_gate_core::AuditError;
use agent_gate_core::AuditRecord;
use agent_gate_core::AuditSink;
use agent_gate_core::AuthorityError;
use agent_gate_core::ClientHandshake;
use agent_gate_core::ClientInfoStore;
use agent_gate_core::ConnectionId;
use agent_gate_core::IdentityAuthority;
use agent_gate_core::PolicyAuthority;
use agent_gate_core::PolicyDecision;
use agent_gate_core::PolicyGate;
use agent_gate_core::PolicyGateBuilder;
use agent_gate_core::PolicyId;
use agent_gate_core::PolicyRequest;
use agent_gate_core::RegisteredAgent;
use agent_gate_core::RegistrationRequest;
use agent_gate_core::SingleUseCredential;
use agent_gate_core::capture_client_info;
use async_trait::async_trait;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default policy used by test gates.
pub const DEFAULT_POLICY: &str = "policy_a4e4d26bdbfa4c57bc52a67952500cc7";
/// Stricter policy used for prescription tools.
pub const PRESCRIPTION_POLICY: &str = "policy_prescriptions_xyz123";

// ============================================================================
// SECTION: Fake Authority
// ============================================================================

/// Policy decision function.
type Decider = Box<dyn Fn(&PolicyRequest) -> PolicyDecision + Send + Sync>;

/// Evaluation request captured by the fake policy authority.
#[derive(Debug, Clone)]
pub struct RecordedEvaluation {
    /// Request submitted by the gate.
    pub request: PolicyRequest,
    /// Credential token that backed the request.
    pub credential: String,
}

/// Combined identity and policy authority with failure injection.
pub struct FakeAuthority {
    registrations: AtomicUsize,
    credentials: AtomicUsize,
    evaluations: Mutex<Vec<RecordedEvaluation>>,
    fail_registration: AtomicBool,
    fail_credential: AtomicBool,
    fail_evaluation: AtomicBool,
    registration_delay: Duration,
    evaluation_delay: Duration,
    decider: Decider,
}

impl Default for FakeAuthority {
    fn default() -> Self {
        Self {
            registrations: AtomicUsize::new(0),
            credentials: AtomicUsize::new(0),
            evaluations: Mutex::new(Vec::new()),
            fail_registration: AtomicBool::new(false),
            fail_credential: AtomicBool::new(false),
            fail_evaluation: AtomicBool::new(false),
            registration_delay: Duration::ZERO,
            evaluation_delay: Duration::ZERO,
            decider: Box::new(|_| PolicyDecision::allow()),
        }
    }
}

impl FakeAuthority {
    /// Creates an authority that allows everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Creates an authority that decides with `decider`.
    pub fn with_decider(
        decider: impl Fn(&PolicyRequest) -> PolicyDecision + Send + Sync + 'static,
    ) -> Self {
        Self {
            decider: Box::new(decider),
            ..Self::default()
        }
    }

    /// Delays every registration.
    pub fn with_registration_delay(mut self, delay: Duration) -> Self {
        self.registration_delay = delay;
        self
    }

    /// Delays every evaluation.
    pub fn with_evaluation_delay(mut self, delay: Duration) -> Self {
        self.evaluation_delay = delay;
        self
    }

    pub fn fail_registration(&self, fail: bool) {
        self.fail_registration.store(fail, Ordering::SeqCst);
    }

    pub fn fail_credential(&self, fail: bool) {
        self.fail_credential.store(fail, Ordering::SeqCst);
    }

    pub fn fail_evaluation(&self, fail: bool) {
        self.fail_evaluation.store(fail, Ordering::SeqCst);
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn credentials_issued(&self) -> usize {
        self.credentials.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> Vec<RecordedEvaluation> {
        self.evaluations.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityAuthority for FakeAuthority {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegisteredAgent, AuthorityError> {
        if !self.registration_delay.is_zero() {
            tokio::time::sleep(self.registration_delay).await;
        }
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable("identity authority offline".to_string()));
        }
        let count = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RegisteredAgent {
            agent_id: format!("agent_{count:03}").into(),
            did: Some(format!("did:web:agents.example:{}", request.name)),
            developer_did: Some("did:web:dev.example".to_string()),
        })
    }

    async fn issue_credential(&self, agent: &Agent) -> Result<SingleUseCredential, AuthorityError> {
        if self.fail_credential.load(Ordering::SeqCst) {
            return Err(AuthorityError::Rejected("token endpoint refused".to_string()));
        }
        let count = self.credentials.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SingleUseCredential::new(format!("token-{}-{count}", agent.agent_id)))
    }
}

#[async_trait]
impl PolicyAuthority for FakeAuthority {
    async fn evaluate(
        &self,
        request: &PolicyRequest,
        credential: SingleUseCredential,
    ) -> Result<PolicyDecision, AuthorityError> {
        if !self.evaluation_delay.is_zero() {
            tokio::time::sleep(self.evaluation_delay).await;
        }
        if self.fail_evaluation.load(Ordering::SeqCst) {
            return Err(AuthorityError::Malformed("decision missing allow".to_string()));
        }
        self.evaluations.lock().unwrap().push(RecordedEvaluation {
            request: request.clone(),
            credential: credential.into_token(),
        });
        Ok((self.decider)(request))
    }
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink that keeps every record in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    notify: tokio::sync::Notify,
}

impl RecordingAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Waits until at least `count` records arrived.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.records.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().unwrap().push(record.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Audit sink that always fails.
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Sink("audit endpoint returned 503".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a gate with inline audit delivery and the default policy.
pub fn gate_builder(
    authority: &Arc<FakeAuthority>,
    audit: Arc<dyn AuditSink>,
) -> PolicyGateBuilder {
    let identity: Arc<dyn IdentityAuthority> = Arc::<FakeAuthority>::clone(authority);
    let policy: Arc<dyn PolicyAuthority> = Arc::<FakeAuthority>::clone(authority);
    PolicyGate::builder(identity, policy)
        .audit(audit)
        .server_name("healthcare-server")
        .default_policy_id(PolicyId::new(DEFAULT_POLICY))
        .audit_delivery(AuditDelivery::Inline)
}

/// Records an MCP-style handshake for `connection`.
pub fn connect(
    store: &ClientInfoStore,
    connection: &str,
    name: &str,
    version: &str,
) -> ConnectionId {
    let connection_id = ConnectionId::new(connection);
    let handshake = ClientHandshake {
        name: Some(name.to_string()),
        version: Some(version.to_string()),
        capabilities: json!({"roots": {"listChanged": true}, "sampling": {}}),
        ..ClientHandshake::default()
    };
    capture_client_info(store, &connection_id, &handshake);
    connection_id
}
