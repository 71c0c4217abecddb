// crates/agent-gate-config/src/config.rs
// ============================================================================
// Module: Agent Gate Configuration
// Description: Configuration loading and validation for Agent Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: agent-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a gate without a default
//! policy or a reachable authority must not start.
//! Security posture: config inputs are untrusted; API keys should come from
//! the environment rather than the file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use agent_gate_core::AuditDelivery;
use agent_gate_core::EnforcementTimeouts;
use agent_gate_core::PolicyId;
use agent_gate_core::runtime::gate::DEFAULT_AUDIT_TIMEOUT_MS;
use agent_gate_core::runtime::gate::DEFAULT_CREDENTIAL_TIMEOUT_MS;
use agent_gate_core::runtime::gate::DEFAULT_EVALUATION_TIMEOUT_MS;
use agent_gate_core::runtime::gate::DEFAULT_REGISTRATION_TIMEOUT_MS;
use agent_gate_core::runtime::gate::DEFAULT_SERVER_NAME;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "agent-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "AGENT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum request body size accepted by the HTTP transport.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum length of identifiers such as policy ids and server names.
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 256;
/// Maximum length of the authority base URL.
pub(crate) const MAX_URL_LENGTH: usize = 2048;
/// Default authority connect timeout in milliseconds.
pub(crate) const DEFAULT_AUTHORITY_CONNECT_TIMEOUT_MS: u64 = 2_000;
/// Default authority request timeout in milliseconds.
pub(crate) const DEFAULT_AUTHORITY_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Minimum authority connect timeout in milliseconds.
pub(crate) const MIN_AUTHORITY_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum authority connect timeout in milliseconds.
pub(crate) const MAX_AUTHORITY_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum authority request timeout in milliseconds.
pub(crate) const MIN_AUTHORITY_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum authority request timeout in milliseconds.
pub(crate) const MAX_AUTHORITY_REQUEST_TIMEOUT_MS: u64 = 60_000;
/// Minimum enforcement stage timeout in milliseconds.
pub(crate) const MIN_STAGE_TIMEOUT_MS: u64 = 100;
/// Maximum enforcement stage timeout in milliseconds.
pub(crate) const MAX_STAGE_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Agent Gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentGateConfig {
    /// MCP host configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity and policy authority configuration.
    #[serde(default)]
    pub authority: AuthorityConfig,
    /// Policy selection configuration.
    pub policy: PolicyConfig,
    /// Enforcement stage timeouts.
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Diagnostic logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl AgentGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.authority.validate()?;
        self.policy.validate()?;
        self.enforcement.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// MCP transport selection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Single connection over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// Server configuration for the MCP host.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, reported on initialize and used in resource URIs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Permits binding the HTTP transport to a non-loopback address.
    #[serde(default)]
    pub allow_non_loopback: bool,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            transport: ServerTransport::Stdio,
            bind: None,
            allow_non_loopback: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address for the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("server.name", &self.name)?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        match self.transport {
            ServerTransport::Http => {
                let addr = self.bind_addr()?;
                if !addr.ip().is_loopback() && !self.allow_non_loopback {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind requires server.allow_non_loopback".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not accept a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Identity and policy authority connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    /// Authority base URL.
    #[serde(default)]
    pub base_url: String,
    /// Permits plaintext `http://` base URLs.
    #[serde(default)]
    pub allow_http: bool,
    /// Inline API key. Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_authority_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_authority_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            allow_http: false,
            api_key: None,
            api_key_env: None,
            connect_timeout_ms: default_authority_connect_timeout_ms(),
            request_timeout_ms: default_authority_request_timeout_ms(),
        }
    }
}

impl AuthorityConfig {
    /// Resolves the API key from the inline value or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `api_key_env` names an unset variable.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }
        let Some(var) = &self.api_key_env else {
            return Ok(None);
        };
        match env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            _ => Err(ConfigError::Invalid(format!("authority.api_key_env {var} is not set"))),
        }
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates authority settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("authority.base_url must be set".to_string()));
        }
        if base_url.len() > MAX_URL_LENGTH {
            return Err(ConfigError::Invalid("authority.base_url exceeds max length".to_string()));
        }
        let host = if let Some(rest) = base_url.strip_prefix("https://") {
            rest
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            if !self.allow_http {
                return Err(ConfigError::Invalid(
                    "authority.base_url uses http without authority.allow_http".to_string(),
                ));
            }
            rest
        } else {
            return Err(ConfigError::Invalid(
                "authority.base_url must use http or https".to_string(),
            ));
        };
        if host.split('/').next().unwrap_or_default().is_empty() {
            return Err(ConfigError::Invalid("authority.base_url must include a host".to_string()));
        }
        if self.api_key.is_some() && self.api_key_env.is_some() {
            return Err(ConfigError::Invalid(
                "authority.api_key and authority.api_key_env are mutually exclusive".to_string(),
            ));
        }
        if let Some(var) = &self.api_key_env {
            validate_identifier("authority.api_key_env", var)?;
        }
        validate_timeout_range(
            "authority.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_AUTHORITY_CONNECT_TIMEOUT_MS,
            MAX_AUTHORITY_CONNECT_TIMEOUT_MS,
        )?;
        validate_timeout_range(
            "authority.request_timeout_ms",
            self.request_timeout_ms,
            MIN_AUTHORITY_REQUEST_TIMEOUT_MS,
            MAX_AUTHORITY_REQUEST_TIMEOUT_MS,
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Policy selection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Policy applied to tools without an override. Required.
    pub default_policy_id: String,
    /// Replaces the `mcp://{server}/tools` resource prefix.
    #[serde(default)]
    pub resource_prefix: Option<String>,
}

impl PolicyConfig {
    /// Returns the parsed default policy id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the id is blank.
    pub fn default_policy_id(&self) -> Result<PolicyId, ConfigError> {
        PolicyId::parse(&self.default_policy_id).ok_or_else(|| {
            ConfigError::Invalid("policy.default_policy_id must be non-empty".to_string())
        })
    }

    /// Validates policy settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let policy_id = self.default_policy_id()?;
        if policy_id.as_str().len() > MAX_IDENTIFIER_LENGTH {
            return Err(ConfigError::Invalid(
                "policy.default_policy_id exceeds max length".to_string(),
            ));
        }
        if let Some(prefix) = &self.resource_prefix {
            let prefix = prefix.trim();
            if prefix.is_empty() || prefix.len() > MAX_URL_LENGTH {
                return Err(ConfigError::Invalid(
                    "policy.resource_prefix must be non-empty and bounded".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

/// Per-stage enforcement timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct EnforcementConfig {
    /// Agent registration timeout in milliseconds.
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
    /// Credential issuance timeout in milliseconds.
    #[serde(default = "default_credential_timeout_ms")]
    pub credential_timeout_ms: u64,
    /// Policy evaluation timeout in milliseconds.
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,
    /// Audit delivery timeout in milliseconds.
    #[serde(default = "default_audit_timeout_ms")]
    pub audit_timeout_ms: u64,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            registration_timeout_ms: default_registration_timeout_ms(),
            credential_timeout_ms: default_credential_timeout_ms(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
            audit_timeout_ms: default_audit_timeout_ms(),
        }
    }
}

impl EnforcementConfig {
    /// Converts the configured values into runtime timeouts.
    #[must_use]
    pub const fn timeouts(&self) -> EnforcementTimeouts {
        EnforcementTimeouts {
            registration: Duration::from_millis(self.registration_timeout_ms),
            credential: Duration::from_millis(self.credential_timeout_ms),
            evaluation: Duration::from_millis(self.evaluation_timeout_ms),
            audit: Duration::from_millis(self.audit_timeout_ms),
        }
    }

    /// Validates stage timeouts.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("enforcement.registration_timeout_ms", self.registration_timeout_ms),
            ("enforcement.credential_timeout_ms", self.credential_timeout_ms),
            ("enforcement.evaluation_timeout_ms", self.evaluation_timeout_ms),
            ("enforcement.audit_timeout_ms", self.audit_timeout_ms),
        ] {
            validate_timeout_range(field, value, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Forward records to the authority's audit endpoint.
    Authority,
    /// Append JSON lines to a local file.
    File,
    /// Emit JSON lines through `tracing`.
    #[default]
    Tracing,
    /// Discard records.
    None,
}

/// Audit delivery mode.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditDeliveryMode {
    /// Deliver in a background task.
    #[default]
    Detached,
    /// Deliver before the call returns.
    Inline,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
    /// Delivery mode.
    #[serde(default)]
    pub delivery: AuditDeliveryMode,
}

impl AuditConfig {
    /// Returns the runtime delivery mode.
    #[must_use]
    pub const fn delivery(&self) -> AuditDelivery {
        match self.delivery {
            AuditDeliveryMode::Detached => AuditDelivery::Detached,
            AuditDeliveryMode::Inline => AuditDelivery::Inline,
        }
    }

    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink = file requires audit.path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid(
                    "audit.path is only valid with audit.sink = file".to_string(),
                ))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("logging.level", &self.level)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a short, non-blank identifier.
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Default server name.
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default authority connect timeout in milliseconds.
pub(crate) const fn default_authority_connect_timeout_ms() -> u64 {
    DEFAULT_AUTHORITY_CONNECT_TIMEOUT_MS
}

/// Default authority request timeout in milliseconds.
pub(crate) const fn default_authority_request_timeout_ms() -> u64 {
    DEFAULT_AUTHORITY_REQUEST_TIMEOUT_MS
}

/// Default registration timeout in milliseconds.
pub(crate) const fn default_registration_timeout_ms() -> u64 {
    DEFAULT_REGISTRATION_TIMEOUT_MS
}

/// Default credential timeout in milliseconds.
pub(crate) const fn default_credential_timeout_ms() -> u64 {
    DEFAULT_CREDENTIAL_TIMEOUT_MS
}

/// Default evaluation timeout in milliseconds.
pub(crate) const fn default_evaluation_timeout_ms() -> u64 {
    DEFAULT_EVALUATION_TIMEOUT_MS
}

/// Default audit timeout in milliseconds.
pub(crate) const fn default_audit_timeout_ms() -> u64 {
    DEFAULT_AUDIT_TIMEOUT_MS
}

/// Default logging filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    fn authority() -> AuthorityConfig {
        AuthorityConfig {
            base_url: "https://authority.example.com".to_string(),
            ..AuthorityConfig::default()
        }
    }

    // ============================================================================
    // SECTION: ServerConfig::validate() Tests
    // ============================================================================

    #[test]
    fn server_default_is_stdio_and_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.transport, ServerTransport::Stdio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_http_requires_bind() {
        let config = ServerConfig {
            transport: ServerTransport::Http,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bind address"));
    }

    #[test]
    fn server_http_rejects_public_bind_without_opt_in() {
        let config = ServerConfig {
            transport: ServerTransport::Http,
            bind: Some("0.0.0.0:8080".to_string()),
            ..ServerConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("allow_non_loopback"));
        let opted_in = ServerConfig {
            allow_non_loopback: true,
            ..config
        };
        assert!(opted_in.validate().is_ok());
    }

    #[test]
    fn server_rejects_oversized_body_limit() {
        let config = ServerConfig {
            max_body_bytes: MAX_BODY_BYTES_LIMIT + 1,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // ============================================================================
    // SECTION: AuthorityConfig::validate() Tests
    // ============================================================================

    #[test]
    fn authority_requires_base_url() {
        let err = AuthorityConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("authority.base_url must be set"));
    }

    #[test]
    fn authority_rejects_plain_http_without_opt_in() {
        let config = AuthorityConfig {
            base_url: "http://localhost:9000".to_string(),
            ..AuthorityConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("allow_http"));
        let opted_in = AuthorityConfig {
            allow_http: true,
            ..config
        };
        assert!(opted_in.validate().is_ok());
    }

    #[test]
    fn authority_rejects_unknown_scheme_and_missing_host() {
        let ftp = AuthorityConfig {
            base_url: "ftp://authority.example.com".to_string(),
            ..AuthorityConfig::default()
        };
        assert!(ftp.validate().is_err());
        let hostless = AuthorityConfig {
            base_url: "https:///v1".to_string(),
            ..AuthorityConfig::default()
        };
        assert!(hostless.validate().unwrap_err().to_string().contains("host"));
    }

    #[test]
    fn authority_key_sources_are_exclusive() {
        let config = AuthorityConfig {
            api_key: Some("inline".to_string()),
            api_key_env: Some("AGENT_GATE_TEST_KEY".to_string()),
            ..authority()
        };
        assert!(config.validate().unwrap_err().to_string().contains("mutually exclusive"));
    }

    #[test]
    fn authority_inline_key_resolves() {
        let config = AuthorityConfig {
            api_key: Some("inline".to_string()),
            ..authority()
        };
        assert_eq!(config.resolve_api_key().unwrap().as_deref(), Some("inline"));
        assert_eq!(authority().resolve_api_key().unwrap(), None);
    }

    #[test]
    fn authority_missing_env_key_fails_closed() {
        let config = AuthorityConfig {
            api_key_env: Some("AGENT_GATE_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..authority()
        };
        assert!(config.resolve_api_key().is_err());
    }

    #[test]
    fn authority_timeouts_are_bounded() {
        let config = AuthorityConfig {
            connect_timeout_ms: MAX_AUTHORITY_CONNECT_TIMEOUT_MS + 1,
            ..authority()
        };
        assert!(config.validate().unwrap_err().to_string().contains("connect_timeout_ms"));
    }

    // ============================================================================
    // SECTION: PolicyConfig / EnforcementConfig / AuditConfig Tests
    // ============================================================================

    #[test]
    fn policy_rejects_blank_default() {
        let config = PolicyConfig {
            default_policy_id: "   ".to_string(),
            resource_prefix: None,
        };
        assert!(config.validate().unwrap_err().to_string().contains("default_policy_id"));
    }

    #[test]
    fn policy_default_is_trimmed() {
        let config = PolicyConfig {
            default_policy_id: " policy_a ".to_string(),
            resource_prefix: None,
        };
        assert_eq!(config.default_policy_id().unwrap().as_str(), "policy_a");
    }

    #[test]
    fn enforcement_defaults_match_runtime_defaults() {
        assert_eq!(EnforcementConfig::default().timeouts(), EnforcementTimeouts::default());
    }

    #[test]
    fn enforcement_rejects_zero_timeout() {
        let config = EnforcementConfig {
            evaluation_timeout_ms: 0,
            ..EnforcementConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("enforcement.evaluation_timeout_ms"));
    }

    #[test]
    fn audit_file_sink_requires_path() {
        let config = AuditConfig {
            sink: AuditSinkKind::File,
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
        let with_path = AuditConfig {
            path: Some("audit.jsonl".to_string()),
            ..config
        };
        assert!(with_path.validate().is_ok());
    }

    #[test]
    fn audit_path_without_file_sink_is_rejected() {
        let config = AuditConfig {
            path: Some("audit.jsonl".to_string()),
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn audit_delivery_maps_to_runtime() {
        let config = AuditConfig {
            delivery: AuditDeliveryMode::Inline,
            ..AuditConfig::default()
        };
        assert_eq!(config.delivery(), AuditDelivery::Inline);
        assert_eq!(AuditConfig::default().delivery(), AuditDelivery::Detached);
    }

    // ============================================================================
    // SECTION: validate_timeout_range() Tests
    // ============================================================================

    #[test]
    fn validate_timeout_range_accepts_bounds() {
        for value in [MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS] {
            assert!(
                validate_timeout_range("t", value, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS)
                    .is_ok()
            );
        }
    }

    #[test]
    fn validate_timeout_range_error_includes_field_and_bounds() {
        let err = validate_timeout_range("stage_timeout", 5, 100, 200).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("stage_timeout"));
        assert!(message.contains("100") && message.contains("200"));
    }
}
