//! Execution audit trail
//!
//! Appends one JSON line per orchestration run. Writing the trail never
//! changes the outcome of a run; failures are logged and dropped.

use crate::executor::{ExecutionResult, SigningMode};
use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One line of the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    run_id: String,
    quote_id: &'a str,
    mode: Option<SigningMode>,
    chain_id: Option<u64>,
    success: bool,
    tx_hash: Option<TxHash>,
    approvals: usize,
    error_kind: Option<&'a str>,
    error: Option<&'a str>,
    duration_ms: u64,
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL log of execution runs; cheap to clone
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter { path: path.into() })),
        }
    }

    /// Record a finished run
    pub async fn record(&self, quote_id: &str, result: &ExecutionResult, elapsed: Duration) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            run_id: Uuid::new_v4().to_string(),
            quote_id,
            mode: result.mode,
            chain_id: result.chain_id,
            success: result.success,
            tx_hash: result.tx_hash,
            approvals: result.approval_hashes.len(),
            error_kind: result.error_kind,
            error: result.error.as_deref(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        };

        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(path = %writer.path.display(), error = %e, "Failed to write audit log entry");
        }
    }
}
