// crates/agent-gate-mcp/tests/common/mod.rs
// ============================================================================
// Module: MCP Test Fixtures
// Description: Fake authorities, recording audit sink, and a healthcare host.
// Purpose: Drive guarded tools through the MCP host end to end.
// Dependencies: agent-gate-core, agent-gate-mcp, tokio
// ============================================================================

//! ## Overview
//! [`healthcare_host`] wires a [`McpHost`] through [`setup`] with a
//! [`FakeAuthority`] that denies high-risk prescriptions, then registers the
//! healthcare tools: patient records, prescriptions, lab uploads, agent
//! status, and server info.

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

use agent_gate_core::Agent;
use agent_gate_core::AuditDelivery;
use agent_gate_core::AuditError;
use agent_gate_core::AuditRecord;
use agent_gate_core::AuditSink;
use agent_gate_core::AuthorityError;
use agent_gate_core::CallScope;
use agent_gate_core::ContextBuilder;
use agent_gate_core::GuardOptions;
use agent_gate_core::IdentityAuthority;
use agent_gate_core::PolicyAuthority;
use agent_gate_core::PolicyDecision;
use agent_gate_core::PolicyGate;
use agent_gate_core::PolicyId;
use agent_gate_core::PolicyRequest;
use agent_gate_core::RegisteredAgent;
use agent_gate_core::RegistrationRequest;
use agent_gate_core::SingleUseCredential;
use agent_gate_core::ToolError;
use agent_gate_core::ToolSignature;
use agent_gate_core::tool_fn;
use agent_gate_mcp::McpHost;
use agent_gate_mcp::SetupParams;
use agent_gate_mcp::json_tool;
use agent_gate_mcp::setup;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name used for resource URIs.
pub const SERVER_NAME: &str = "healthcare-server";
/// Default policy.
pub const DEFAULT_POLICY: &str = "policy_a4e4d26bdbfa4c57bc52a67952500cc7";
/// Policy applied to prescriptions.
pub const PRESCRIPTION_POLICY: &str = "policy_prescriptions_xyz123";

// ============================================================================
// SECTION: Fake Authority
// ============================================================================

/// Identity and policy authority that denies `risk_level = "high"`.
#[derive(Default)]
pub struct FakeAuthority {
    registrations: AtomicUsize,
    credentials: AtomicUsize,
    evaluations: Mutex<Vec<(PolicyRequest, String)>>,
    fail_credential: AtomicBool,
}

impl FakeAuthority {
    pub fn fail_credential(&self, fail: bool) {
        self.fail_credential.store(fail, Ordering::SeqCst);
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Returns each evaluated request with the token that backed it.
    pub fn evaluations(&self) -> Vec<(PolicyRequest, String)> {
        self.evaluations.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityAuthority for FakeAuthority {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegisteredAgent, AuthorityError> {
        let count = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RegisteredAgent {
            agent_id: format!("agent_{count:03}").into(),
            did: Some(format!("did:web:agents.example:{}", request.name)),
            developer_did: None,
        })
    }

    async fn issue_credential(&self, agent: &Agent) -> Result<SingleUseCredential, AuthorityError> {
        if self.fail_credential.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable("token endpoint timed out".to_string()));
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
        self.evaluations.lock().unwrap().push((request.clone(), credential.into_token()));
        if request.context.get("risk_level") == Some(&json!("high")) {
            return Ok(PolicyDecision::deny("controlled substance"));
        }
        Ok(PolicyDecision::allow())
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink that keeps every record in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Healthcare Tools
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PatientRecordArgs {
    pub patient_id: String,
    pub data_type: String,
}

#[derive(Debug, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    #[serde(default)]
    pub controlled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionArgs {
    pub patient_id: String,
    pub prescription: Prescription,
}

#[derive(Debug, Deserialize)]
pub struct LabUploadArgs {
    pub patient_id: String,
    pub test_name: String,
    pub urgency: String,
}

#[derive(Debug, Deserialize)]
pub struct NoArgs {}

/// Host, gate, and fixtures for one test.
pub struct Healthcare {
    pub host: McpHost,
    pub gate: PolicyGate,
    pub authority: Arc<FakeAuthority>,
    pub audit: Arc<RecordingAuditSink>,
    /// Number of times a prescription tool body ran.
    pub prescriptions_written: Arc<AtomicUsize>,
}

/// Builds a host with every healthcare tool registered.
pub fn healthcare_host() -> Healthcare {
    let authority = Arc::new(FakeAuthority::default());
    let audit = Arc::new(RecordingAuditSink::default());
    let mut host = McpHost::new(SERVER_NAME);
    let gate = setup(
        SetupParams::new(
            &mut host,
            Arc::clone(&authority) as Arc<dyn IdentityAuthority>,
            Arc::clone(&authority) as Arc<dyn PolicyAuthority>,
        )
        .audit(Arc::clone(&audit) as Arc<dyn AuditSink>)
        .default_policy_id(PolicyId::new(DEFAULT_POLICY))
        .audit_delivery(AuditDelivery::Inline),
    )
    .expect("setup");
    let prescriptions_written = Arc::new(AtomicUsize::new(0));
    register_tools(&mut host, &gate, &prescriptions_written);
    Healthcare {
        host,
        gate,
        authority,
        audit,
        prescriptions_written,
    }
}

fn register_tools(host: &mut McpHost, gate: &PolicyGate, written: &Arc<AtomicUsize>) {
    let records = tool_fn(
        ToolSignature::new("get_patient_record", ["patient_id", "data_type"]),
        |_scope: CallScope, args: PatientRecordArgs| async move {
            Ok::<_, ToolError>(json!({
                "patient_id": args.patient_id,
                "data_type": args.data_type,
                "records": ["2026-01-04 annual physical"],
            }))
        },
    );
    let records_context =
        ContextBuilder::new(["patient_id", "data_type"], |args: &PatientRecordArgs| {
            let mut map = Map::new();
            map.insert("patient_id".to_string(), json!(args.patient_id));
            map.insert("data_type".to_string(), json!(args.data_type));
            map.insert("resource_type".to_string(), json!("patient_record"));
            map
        });
    let records = gate.guard(records, GuardOptions::new(records_context)).expect("guard");
    host.register_tool(json_tool(records, "Read a patient record")).expect("register");

    let written = Arc::clone(written);
    let prescriptions = tool_fn(
        ToolSignature::new("write_prescription", ["patient_id", "prescription"]),
        move |_scope: CallScope, args: PrescriptionArgs| {
            let written = Arc::clone(&written);
            async move {
                written.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ToolError>(json!({
                    "status": "prescribed",
                    "patient_id": args.patient_id,
                    "medication": args.prescription.medication,
                    "dosage": args.prescription.dosage,
                }))
            }
        },
    );
    let prescription_context =
        ContextBuilder::new(["patient_id", "prescription"], |args: &PrescriptionArgs| {
            let mut map = Map::new();
            map.insert("patient_id".to_string(), json!(args.patient_id));
            map.insert("medication".to_string(), json!(args.prescription.medication));
            let risk = if args.prescription.controlled { "high" } else { "standard" };
            map.insert("risk_level".to_string(), json!(risk));
            map
        });
    let prescriptions = gate
        .guard(
            prescriptions,
            GuardOptions::new(prescription_context)
                .with_policy(PolicyId::new(PRESCRIPTION_POLICY)),
        )
        .expect("guard");
    host.register_tool(json_tool(prescriptions, "Write a prescription")).expect("register");

    let labs = tool_fn(
        ToolSignature::new("upload_lab_results", ["patient_id", "test_name", "urgency"]),
        |_scope: CallScope, args: LabUploadArgs| async move {
            Ok::<_, ToolError>(json!({"status": "uploaded", "test_name": args.test_name}))
        },
    );
    let labs_context = ContextBuilder::new(
        ["patient_id", "test_name", "urgency"],
        |args: &LabUploadArgs| {
            let mut map = Map::new();
            map.insert("patient_id".to_string(), json!(args.patient_id));
            map.insert("urgency".to_string(), json!(args.urgency));
            map
        },
    );
    let labs = gate
        .guard(labs, GuardOptions::new(labs_context).with_resource("ehr://labs/uploads"))
        .expect("guard");
    host.register_tool(json_tool(labs, "Upload lab results")).expect("register");

    let status_gate = gate.clone();
    let status = tool_fn(
        ToolSignature::new("get_agent_status", Vec::<String>::new()),
        move |scope: CallScope, _args: NoArgs| {
            let gate = status_gate.clone();
            async move {
                let agent = gate.current_agent(&scope).await?;
                Ok::<_, ToolError>(json!({
                    "agent_id": agent.agent_id,
                    "agent_did": agent.did,
                    "name": agent.name(),
                    "capabilities": agent.metadata.capabilities,
                }))
            }
        },
    );
    host.register_tool(json_tool(status, "Report the calling agent")).expect("register");

    let info = tool_fn(
        ToolSignature::new("get_server_info", Vec::<String>::new()),
        |_scope: CallScope, _args: NoArgs| async move {
            Ok::<_, ToolError>(json!({"name": SERVER_NAME, "enforcement": "enabled"}))
        },
    );
    host.register_tool(json_tool(info, "Describe the server")).expect("register");
}

// ============================================================================
// SECTION: JSON-RPC Helpers
// ============================================================================

/// Builds an `initialize` request for the named client.
pub fn initialize(id: u64, name: &str, version: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {"roots": {"listChanged": true}},
            "clientInfo": {"name": name, "version": version}
        }
    })
}

/// Builds a `tools/call` request.
pub fn call(id: u64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments}
    })
}

/// Arguments for a patient record lookup.
pub fn record_lookup() -> Value {
    json!({"patient_id": "P-1001", "data_type": "medical_history"})
}

/// Arguments for a prescription.
pub fn prescription(controlled: bool) -> Value {
    let medication = if controlled { "Oxycodone" } else { "Lisinopril" };
    json!({
        "patient_id": "P-1001",
        "prescription": {"medication": medication, "dosage": "10mg", "controlled": controlled}
    })
}
