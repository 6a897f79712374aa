// In-memory backends for pipeline tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use querykill::core::{KillMode, SessionRecord};
use querykill::db::{AuditRecord, AuditStore, BackendError, LogEntry, SessionSource};

pub const LISTING: &str = "SHOW FULL PROCESSLIST";

pub fn record(id: u64, command: &str, info: Option<&str>) -> SessionRecord {
    SessionRecord {
        id,
        user: "app".to_string(),
        host: "10.0.0.5:51234".to_string(),
        db: Some("shop".to_string()),
        command: command.to_string(),
        time_secs: 42,
        state: Some("executing".to_string()),
        info: info.map(str::to_string),
    }
}

/// Session source serving a fixed snapshot
pub struct FakeSource {
    sessions: Result<Vec<SessionRecord>, BackendError>,
    kill_result: Result<(), BackendError>,
    pub list_calls: AtomicUsize,
    pub kills: Mutex<Vec<(u64, KillMode)>>,
}

impl FakeSource {
    pub fn new(sessions: Vec<SessionRecord>) -> Self {
        Self {
            sessions: Ok(sessions),
            kill_result: Ok(()),
            list_calls: AtomicUsize::new(0),
            kills: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_listing(err: BackendError) -> Self {
        Self {
            sessions: Err(err),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_kill_error(mut self, err: BackendError) -> Self {
        self.kill_result = Err(err);
        self
    }

    pub fn kills(&self) -> Vec<(u64, KillMode)> {
        self.kills.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionSource for FakeSource {
    fn listing_statement(&self) -> &str {
        LISTING
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.sessions.clone()
    }

    async fn kill(&self, session_id: u64, mode: KillMode) -> Result<(), BackendError> {
        self.kills.lock().unwrap().push((session_id, mode));
        self.kill_result.clone()
    }
}

/// Audit store keeping entries in memory, optionally failing every write
#[derive(Default)]
pub struct FakeAudit {
    fail: bool,
    pub attempts: AtomicUsize,
    pub entries: Mutex<Vec<LogEntry>>,
}

impl FakeAudit {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditStore for FakeAudit {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ensure_schema(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn record(&self, entry: &LogEntry) -> Result<(), BackendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::server(
                Some(1146),
                "Table 'ops.killed_queries_log' doesn't exist",
            ));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, BackendError> {
        let entries = self.entries();
        Ok(entries
            .into_iter()
            .rev()
            .take(limit)
            .enumerate()
            .map(|(i, entry)| AuditRecord {
                id: i as i64,
                entry,
                killed_at: Utc::now(),
            })
            .collect())
    }
}
