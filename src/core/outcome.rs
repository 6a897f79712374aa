//! Termination modes and outcomes

use serde::{Deserialize, Serialize};

use super::error::ArgumentError;
use super::session::SessionRecord;

/// What a termination request stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KillMode {
    /// Stop only the running statement; the session stays connected
    #[default]
    Query,
    /// Drop the whole session
    Connection,
}

impl KillMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KillMode::Query => "query",
            KillMode::Connection => "connection",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, ArgumentError> {
        match s {
            "query" => Ok(KillMode::Query),
            "connection" => Ok(KillMode::Connection),
            _ => Err(ArgumentError::Invalid {
                field: "mode",
                reason: format!("expected 'query' or 'connection', got '{}'", s),
            }),
        }
    }
}

/// How a session that vanished before the kill is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlreadyGonePolicy {
    /// Report `already_finished`
    #[default]
    AlreadyFinished,
    /// Fold into `success`
    Success,
}

impl AlreadyGonePolicy {
    pub fn from_str(s: &str) -> Result<Self, ArgumentError> {
        match s {
            "already_finished" | "already-finished" => Ok(AlreadyGonePolicy::AlreadyFinished),
            "success" => Ok(AlreadyGonePolicy::Success),
            _ => Err(ArgumentError::Invalid {
                field: "already_gone",
                reason: format!("expected 'already_finished' or 'success', got '{}'", s),
            }),
        }
    }
}

/// Classified result of the single termination attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The server accepted the kill
    Terminated {
        session: SessionRecord,
        mode: KillMode,
    },
    /// The session ended between snapshot and kill
    AlreadyGone { session_id: u64 },
    /// The acting user may not kill this session
    PermissionDenied { session_id: u64, detail: String },
    /// Any other server-side failure, raw cause retained
    TerminationFailed { session_id: u64, cause: String },
}

impl TerminationOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, TerminationOutcome::Terminated { .. })
    }
}
