//! Audit logging of successful terminations
//!
//! The kill has already happened by the time this runs. A failed write is
//! reported on the diagnostic channel and nowhere else: it never changes the
//! reported status, never retries, and never undoes the kill.

use tracing::{info, warn};

use super::outcome::TerminationOutcome;
use crate::db::backend::{AuditStore, LogEntry};

/// What happened to the audit write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    /// Entry written
    Logged,
    /// Outcome was not `Terminated`, nothing attempted
    Skipped,
    /// Write attempted and failed
    Failed(String),
}

impl AuditStatus {
    pub fn is_logged(&self) -> bool {
        matches!(self, AuditStatus::Logged)
    }
}

pub struct AuditLogger<'a> {
    store: &'a dyn AuditStore,
    killed_by: &'a str,
}

impl<'a> AuditLogger<'a> {
    pub fn new(store: &'a dyn AuditStore, killed_by: &'a str) -> Self {
        Self { store, killed_by }
    }

    /// Write one entry for a `Terminated` outcome; ignore everything else
    pub async fn log(&self, outcome: &TerminationOutcome) -> AuditStatus {
        let TerminationOutcome::Terminated { session, .. } = outcome else {
            return AuditStatus::Skipped;
        };

        let entry = LogEntry {
            session_id: session.id,
            statement: session.info.clone(),
            host: session.host.clone(),
            user: session.user.clone(),
            db_name: session.db.clone(),
            killed_by: self.killed_by.to_string(),
        };

        match self.store.record(&entry).await {
            Ok(()) => {
                info!(
                    "Recorded kill of session {} in {} audit log",
                    entry.session_id,
                    self.store.kind()
                );
                AuditStatus::Logged
            }
            Err(e) => {
                warn!(
                    "Failed to record kill of session {} in {} audit log: {}",
                    entry.session_id,
                    self.store.kind(),
                    e
                );
                AuditStatus::Failed(e.to_string())
            }
        }
    }
}
