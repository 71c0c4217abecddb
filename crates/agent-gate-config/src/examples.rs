// crates/agent-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for operators and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Agent Gate configuration. The example validates as
//! written; tests parse it to keep it in sync with the model.

/// Returns a canonical example `agent-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
name = "healthcare-server"
transport = "http"
bind = "127.0.0.1:8080"
max_body_bytes = 1048576

[authority]
base_url = "https://authority.example.com"
api_key_env = "AGENT_GATE_API_KEY"
connect_timeout_ms = 2000
request_timeout_ms = 10000

[policy]
default_policy_id = "policy_a4e4d26bdbfa4c57bc52a67952500cc7"
# resource_prefix = "ehr://records"

[enforcement]
registration_timeout_ms = 10000
credential_timeout_ms = 10000
evaluation_timeout_ms = 10000
audit_timeout_ms = 5000

[audit]
sink = "authority"
delivery = "detached"

[logging]
level = "info"
format = "json"
"#,
    )
}
