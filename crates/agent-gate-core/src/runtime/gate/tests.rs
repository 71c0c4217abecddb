// crates/agent-gate-core/src/runtime/gate/tests.rs
// ============================================================================
// Module: Policy Gate Unit Tests
// Description: Unit tests for resource derivation, policy resolution, and wrapping.
// Purpose: Validate gate helpers that do not need a full pipeline.
// Dependencies: agent-gate-core, tokio
// ============================================================================

//! ## Overview
//! Covers the gate's deterministic helpers. Pipeline behavior against fake
//! authorities lives in the crate's integration tests.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use super::EnforcementTarget;
use super::GuardOptions;
use super::PolicyGate;
use super::PolicyGateBuilder;
use crate::core::Agent;
use crate::core::PolicyDecision;
use crate::core::PolicyId;
use crate::interfaces::AuthorityError;
use crate::interfaces::IdentityAuthority;
use crate::interfaces::PolicyAuthority;
use crate::interfaces::PolicyRequest;
use crate::interfaces::RegisteredAgent;
use crate::interfaces::RegistrationRequest;
use crate::interfaces::SingleUseCredential;
use crate::runtime::context::ContextBuilder;
use crate::runtime::error::ConfigurationError;
use crate::runtime::error::EnforcementError;
use crate::runtime::tool::CallScope;
use crate::runtime::tool::Tool;
use crate::runtime::tool::ToolError;
use crate::runtime::tool::ToolSignature;
use crate::runtime::tool::tool_fn;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

struct StaticAuthority;

#[async_trait]
impl IdentityAuthority for StaticAuthority {
    async fn register(
        &self,
        _request: &RegistrationRequest,
    ) -> Result<RegisteredAgent, AuthorityError> {
        Ok(RegisteredAgent {
            agent_id: "agent_001".into(),
            did: None,
            developer_did: None,
        })
    }

    async fn issue_credential(&self, _agent: &Agent) -> Result<SingleUseCredential, AuthorityError> {
        Ok(SingleUseCredential::new("token"))
    }
}

#[async_trait]
impl PolicyAuthority for StaticAuthority {
    async fn evaluate(
        &self,
        _request: &PolicyRequest,
        _credential: SingleUseCredential,
    ) -> Result<PolicyDecision, AuthorityError> {
        Ok(PolicyDecision::allow())
    }
}

fn gate_with(configure: impl FnOnce(PolicyGateBuilder) -> PolicyGateBuilder) -> PolicyGate {
    let authority = Arc::new(StaticAuthority);
    configure(PolicyGate::builder(Arc::<StaticAuthority>::clone(&authority), authority)).build()
}

fn lookup_signature() -> ToolSignature {
    ToolSignature::new("get_patient_record", ["patient_id"])
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn default_resource_uses_server_name() {
    let gate = gate_with(|builder| builder.server_name("healthcare-server"));
    let signature = lookup_signature();
    assert_eq!(
        gate.resource_for(EnforcementTarget::new(&signature)),
        "mcp://healthcare-server/tools/get_patient_record"
    );
}

#[test]
fn resource_prefix_replaces_default_uri() {
    let gate = gate_with(|builder| builder.resource_prefix("ehr://records/"));
    let signature = lookup_signature();
    assert_eq!(
        gate.resource_for(EnforcementTarget::new(&signature)),
        "ehr://records/get_patient_record"
    );
}

#[test]
fn resource_override_wins() {
    let gate = gate_with(|builder| builder.resource_prefix("ehr://records"));
    let signature = lookup_signature();
    let target = EnforcementTarget {
        resource: Some("ehr://patients/P-1"),
        ..EnforcementTarget::new(&signature)
    };
    assert_eq!(gate.resource_for(target), "ehr://patients/P-1");
}

#[test]
fn override_policy_precedes_default() {
    let gate = gate_with(|builder| builder.default_policy_id(PolicyId::new("policy_default")));
    let signature = lookup_signature();
    let strict = PolicyId::new("policy_prescriptions");
    let target = EnforcementTarget {
        policy_id: Some(&strict),
        ..EnforcementTarget::new(&signature)
    };
    assert_eq!(gate.resolve_policy(target).unwrap(), strict);
    assert_eq!(
        gate.resolve_policy(EnforcementTarget::new(&signature)).unwrap().as_str(),
        "policy_default"
    );
}

#[test]
fn missing_policy_is_configuration_error() {
    let gate = gate_with(|builder| builder);
    let signature = lookup_signature();
    let err = gate.resolve_policy(EnforcementTarget::new(&signature)).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::MissingPolicy {
            tool: "get_patient_record".into(),
        }
    );
}

#[test]
fn guard_rejects_mismatched_builder() {
    let gate = gate_with(|builder| builder);
    let tool = tool_fn(lookup_signature(), |_scope: CallScope, patient_id: String| async move {
        Ok::<_, ToolError>(patient_id)
    });
    let builder = ContextBuilder::<String>::passthrough(["record_id"]);
    let Err(err) = gate.guard(tool, GuardOptions::new(builder)) else {
        panic!("mismatched context builder was accepted");
    };
    assert!(matches!(err, ConfigurationError::ContextBuilderMismatch { .. }));
}

#[test]
fn guarded_tool_exposes_wrapped_tool_and_override() {
    let gate = gate_with(|builder| builder.default_policy_id(PolicyId::new("policy_default")));
    let tool = tool_fn(lookup_signature(), |_scope: CallScope, patient_id: String| async move {
        Ok::<_, ToolError>(patient_id)
    });
    let builder = ContextBuilder::<String>::passthrough(["patient_id"]);
    let strict = PolicyId::new("policy_prescriptions");
    let guarded =
        gate.guard(tool, GuardOptions::new(builder).with_policy(strict.clone())).unwrap();
    assert_eq!(guarded.policy_id(), Some(&strict));
    assert_eq!(guarded.inner().signature(), guarded.signature());
    assert_eq!(guarded.inner().signature().name.as_str(), "get_patient_record");

    let plain = gate
        .guard(
            tool_fn(lookup_signature(), |_scope: CallScope, patient_id: String| async move {
                Ok::<_, ToolError>(patient_id)
            }),
            GuardOptions::new(ContextBuilder::<String>::passthrough(["patient_id"])),
        )
        .unwrap();
    assert_eq!(plain.policy_id(), None);
}

#[tokio::test]
async fn unknown_connection_fails_fast() {
    let gate = gate_with(|builder| builder.default_policy_id(PolicyId::new("policy_default")));
    let err = gate.current_agent(&CallScope::new("never-initialized")).await.unwrap_err();
    assert!(matches!(
        err,
        EnforcementError::Configuration(ConfigurationError::MissingClientInfo { .. })
    ));
    assert!(gate.directory().is_empty());
}
