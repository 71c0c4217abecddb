// crates/agent-gate-authority/src/http.rs
// ============================================================================
// Module: HTTP Authority Client
// Description: reqwest-backed identity, policy, and audit authority client.
// Purpose: Map authority endpoints onto the core authority interfaces.
// Dependencies: agent-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpAuthorityClient`] speaks JSON over HTTP to a single authority base
//! URL:
//! - `POST /v1/agents/register` registers a client signature.
//! - `POST /v1/auth/token` issues a single-use credential for an agent.
//! - `POST /v1/policy/decide` evaluates a policy using that credential.
//! - `POST /v1/audit/events` stores one audit record.
//!
//! Status mapping is shared by every endpoint: 401/403 and other 4xx are
//! rejections, 5xx and transport failures mean the authority is unavailable,
//! and a 2xx body that does not decode is malformed.
//!
//! Security posture: the API key and credentials are marked sensitive and
//! never logged; decision payloads without a boolean `allow` are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use agent_gate_core::Agent;
use agent_gate_core::AgentId;
use agent_gate_core::AuditError;
use agent_gate_core::AuditRecord;
use agent_gate_core::AuditSink;
use agent_gate_core::AuthorityError;
use agent_gate_core::IdentityAuthority;
use agent_gate_core::PolicyAuthority;
use agent_gate_core::PolicyDecision;
use agent_gate_core::PolicyRequest;
use agent_gate_core::RegisteredAgent;
use agent_gate_core::RegistrationRequest;
use agent_gate_core::SingleUseCredential;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Agent registration endpoint.
const REGISTER_PATH: &str = "/v1/agents/register";
/// Credential issuance endpoint.
const TOKEN_PATH: &str = "/v1/auth/token";
/// Policy decision endpoint.
const DECIDE_PATH: &str = "/v1/policy/decide";
/// Audit event endpoint.
const AUDIT_PATH: &str = "/v1/audit/events";
/// Header carrying the caller's request identifier on audit events.
const CORRELATION_HEADER: &str = "x-correlation-id";
/// Maximum forwarded correlation id length.
const MAX_CORRELATION_LENGTH: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures constructing an [`HttpAuthorityClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// Base URL is not an absolute http(s) URL.
    #[error("invalid authority base url: {0}")]
    InvalidBaseUrl(String),
    /// API key cannot be sent as a header value.
    #[error("invalid authority api key")]
    InvalidApiKey,
    /// The underlying HTTP client could not be built.
    #[error("authority http client build failed: {0}")]
    Http(String),
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Credential issuance request body.
#[derive(Serialize)]
struct TokenRequest<'a> {
    /// Agent the credential is scoped to.
    agent_id: &'a AgentId,
    /// Agent DID, when registration returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_did: Option<&'a str>,
}

/// Credential issuance response body.
#[derive(Deserialize)]
struct TokenResponse {
    /// Single-use access token.
    access_token: String,
    /// Advertised lifetime in seconds.
    #[serde(default)]
    expires_in: Option<u64>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client for the identity, policy, and audit authority.
///
/// # Invariants
/// - `base_url` has no trailing slash.
/// - One pooled [`Client`] is shared by every endpoint.
pub struct HttpAuthorityClient {
    /// Authority base URL (no trailing slash).
    base_url: String,
    /// Bearer header derived from the API key.
    api_key: Option<HeaderValue>,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpAuthorityClient {
    /// Builds a new authority client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the URL or API key is unusable or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let has_scheme = base_url.starts_with("https://") || base_url.starts_with("http://");
        if !has_scheme {
            return Err(ClientBuildError::InvalidBaseUrl(base_url.to_string()));
        }
        let api_key = api_key
            .map(|key| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                    .map_err(|_| ClientBuildError::InvalidApiKey)?;
                value.set_sensitive(true);
                Ok::<_, ClientBuildError>(value)
            })
            .transpose()?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| ClientBuildError::Http(err.to_string()))?;
        Ok(Self {
            base_url: base_url.to_string(),
            api_key,
            client,
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a JSON body and returns the response after status mapping.
    async fn post<B: Serialize + Sync + ?Sized>(
        &self,
        path: &'static str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<Response, AuthorityError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|err| AuthorityError::Unavailable(format!("{path}: {err}")))?;
        let status = response.status();
        tracing::debug!(endpoint = path, status = status.as_u16(), "authority response");
        check_status(path, status)?;
        Ok(response)
    }

    /// Sends a JSON body and decodes a JSON response.
    async fn post_json<B: Serialize + Sync + ?Sized, T: DeserializeOwned>(
        &self,
        path: &'static str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<T, AuthorityError> {
        let response = self.post(path, body, headers).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| AuthorityError::Malformed(format!("{path}: {err}")))
    }

    /// Returns headers carrying the API key, when configured.
    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = &self.api_key {
            headers.insert(AUTHORIZATION, value.clone());
        }
        headers
    }
}

#[async_trait]
impl IdentityAuthority for HttpAuthorityClient {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegisteredAgent, AuthorityError> {
        let registered: RegisteredAgent =
            self.post_json(REGISTER_PATH, request, self.api_headers()).await?;
        if registered.agent_id.as_str().trim().is_empty() {
            return Err(AuthorityError::Malformed(format!("{REGISTER_PATH}: empty agent_id")));
        }
        Ok(registered)
    }

    async fn issue_credential(&self, agent: &Agent) -> Result<SingleUseCredential, AuthorityError> {
        let body = TokenRequest {
            agent_id: &agent.agent_id,
            agent_did: agent.did.as_deref(),
        };
        let token: TokenResponse = self.post_json(TOKEN_PATH, &body, self.api_headers()).await?;
        if token.access_token.is_empty() {
            return Err(AuthorityError::Malformed(format!("{TOKEN_PATH}: empty access_token")));
        }
        tracing::debug!(
            agent_id = %agent.agent_id,
            expires_in = token.expires_in,
            "credential issued"
        );
        Ok(SingleUseCredential::new(token.access_token))
    }
}

#[async_trait]
impl PolicyAuthority for HttpAuthorityClient {
    async fn evaluate(
        &self,
        request: &PolicyRequest,
        credential: SingleUseCredential,
    ) -> Result<PolicyDecision, AuthorityError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.into_token()))
            .map_err(|_| AuthorityError::Malformed(format!("{DECIDE_PATH}: unusable credential")))?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        let payload: Value = self.post_json(DECIDE_PATH, request, headers).await?;
        parse_decision(payload)
    }
}

#[async_trait]
impl AuditSink for HttpAuthorityClient {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let body =
            serde_json::to_value(record).map_err(|err| AuditError::Serialization(err.to_string()))?;
        let mut headers = self.api_headers();
        if let Some(value) = sanitize_header_value(record.request_id.as_deref()) {
            headers.insert(CORRELATION_HEADER, value);
        }
        self.post(AUDIT_PATH, &body, headers)
            .await
            .map(drop)
            .map_err(|err| AuditError::Sink(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a response status onto the authority error taxonomy.
fn check_status(path: &str, status: StatusCode) -> Result<(), AuthorityError> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error() {
        return Err(AuthorityError::Unavailable(format!("{path}: status {status}")));
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(AuthorityError::Rejected(format!("{path}: not authorized (status {status})")));
    }
    Err(AuthorityError::Rejected(format!("{path}: status {status}")))
}

/// Interprets a decision payload, requiring a boolean `allow`.
fn parse_decision(payload: Value) -> Result<PolicyDecision, AuthorityError> {
    let allow = match payload.get("allow") {
        Some(Value::Bool(allow)) => *allow,
        Some(_) => {
            return Err(AuthorityError::Malformed(format!("{DECIDE_PATH}: allow is not a boolean")));
        }
        None => return Err(AuthorityError::Malformed(format!("{DECIDE_PATH}: missing allow"))),
    };
    let reason = payload.get("reason").and_then(Value::as_str).map(str::to_string);
    Ok(PolicyDecision {
        allow,
        reason,
        raw: payload,
    })
}

/// Sanitizes a header value by enforcing ASCII tchars and length bounds.
fn sanitize_header_value(value: Option<&str>) -> Option<HeaderValue> {
    let value = value?.trim();
    if value.is_empty() || value.len() > MAX_CORRELATION_LENGTH {
        return None;
    }
    if !value.chars().all(is_tchar) {
        return None;
    }
    HeaderValue::from_str(value).ok()
}

/// Returns true when the character is a valid HTTP token character.
const fn is_tchar(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
