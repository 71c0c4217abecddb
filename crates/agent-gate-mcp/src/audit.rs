// crates/agent-gate-mcp/src/audit.rs
// ============================================================================
// Module: Local Audit Sinks
// Description: Audit sinks that write decision records locally.
// Purpose: Emit JSON audit lines without an authority-hosted audit endpoint.
// Dependencies: agent-gate-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! Two sinks serialize each [`AuditRecord`] as one JSON line:
//! [`TracingAuditSink`] routes it through `tracing` under the
//! `agent_gate::audit` target, and [`FileAuditSink`] appends it to a file.
//! Neither sink ever influences the decision that produced the record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use agent_gate_core::AuditError;
use agent_gate_core::AuditRecord;
use agent_gate_core::AuditSink;
use async_trait::async_trait;

// ============================================================================
// SECTION: Tracing Sink
// ============================================================================

/// Audit sink that emits JSON lines through `tracing`.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(record)
            .map_err(|err| AuditError::Serialization(err.to_string()))?;
        tracing::info!(
            target: "agent_gate::audit",
            agent_id = %record.agent_id,
            tool = %record.action,
            outcome = record.decision.outcome_label(),
            record = %payload,
            "policy decision"
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(record)
            .map_err(|err| AuditError::Serialization(err.to_string()))?;
        let mut file =
            self.file.lock().map_err(|_| AuditError::Sink("audit file lock poisoned".to_string()))?;
        writeln!(file, "{payload}").map_err(|err| AuditError::Sink(err.to_string()))?;
        file.flush().map_err(|err| AuditError::Sink(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
