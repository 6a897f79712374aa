//! Session records as reported by the server's process list

use serde::{Deserialize, Serialize};

/// Command kind the server reports for a connection executing a statement.
/// Every other kind (Sleep, Binlog Dump, Daemon, ...) is not actionable.
pub const COMMAND_QUERY: &str = "Query";

/// One row of the process list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Server-assigned thread id. Reused by the server over time.
    pub id: u64,
    pub user: String,
    pub host: String,
    /// Current default database, if any
    pub db: Option<String>,
    /// Command kind ("Query", "Sleep", ...)
    pub command: String,
    /// Seconds spent in the current state
    pub time_secs: i64,
    pub state: Option<String>,
    /// Full statement text; absent when the session is idle
    pub info: Option<String>,
}

impl SessionRecord {
    /// True when the session is running a statement with some text
    pub fn is_executing(&self) -> bool {
        self.command == COMMAND_QUERY
            && self.info.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}

/// Point-in-time list of sessions, in the order the server returned them
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<SessionRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
