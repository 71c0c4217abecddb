// crates/agent-gate-mcp/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Diagnostic logging initialization.
// Purpose: Install a tracing subscriber from logging configuration.
// Dependencies: agent-gate-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! Diagnostics go to stderr so the stdio transport keeps stdout for framed
//! JSON-RPC. `RUST_LOG` overrides the configured filter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_gate_config::LogFormat;
use agent_gate_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Telemetry initialization failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// A global subscriber was already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|err| TelemetryError::Filter(err.to_string()))
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|err| TelemetryError::SubscriberInit(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
