//! Backend traits
//!
//! The pipeline talks to the server and to the audit store only through
//! these traits, so the MySQL and SQLite implementations and the in-memory
//! fakes used by tests are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::outcome::KillMode;
use crate::core::session::SessionRecord;

/// Errors raised by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Could not reach, authenticate with, or keep talking to the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with an error
    #[error("Server error{}: {message}", .code.map(|c| format!(" {}", c)).unwrap_or_default())]
    Server { code: Option<u16>, message: String },
}

impl BackendError {
    pub fn server(code: Option<u16>, message: impl Into<String>) -> Self {
        BackendError::Server {
            code,
            message: message.into(),
        }
    }

    /// Server error number, when there is one
    pub fn code(&self) -> Option<u16> {
        match self {
            BackendError::Server { code, .. } => *code,
            BackendError::Connection(_) => None,
        }
    }
}

/// Source of session snapshots and the target of termination requests
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Statement used to produce the snapshot. Sessions running it are
    /// excluded from matching.
    fn listing_statement(&self) -> &str;

    /// List all sessions at one instant, in server order
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError>;

    /// Send one termination request for the given thread id
    async fn kill(&self, session_id: u64, mode: KillMode) -> Result<(), BackendError>;
}

/// One audit record to be written after a successful termination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub session_id: u64,
    pub statement: Option<String>,
    pub host: String,
    pub user: String,
    pub db_name: Option<String>,
    /// Administrator on whose behalf the kill was issued
    pub killed_by: String,
}

/// A stored audit record, read back from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: LogEntry,
    /// Assigned by the store on insert
    pub killed_at: DateTime<Utc>,
}

/// Durable store for audit records
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Short name for diagnostics ("mysql", "sqlite")
    fn kind(&self) -> &'static str;

    /// Create the audit table if it does not exist
    async fn ensure_schema(&self) -> Result<(), BackendError>;

    /// Insert one entry
    async fn record(&self, entry: &LogEntry) -> Result<(), BackendError>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, BackendError>;
}
