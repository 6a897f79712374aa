//! Outcome reporting
//!
//! Every run ends in exactly one [`Report`]. It is the only place outcomes
//! become visible outside the process: one JSON line on stdout plus the exit
//! code derived from its status.

use serde::Serialize;

use super::audit::AuditStatus;
use super::error::ArgumentError;
use super::matcher::MatchCriteria;
use super::outcome::{AlreadyGonePolicy, KillMode, TerminationOutcome};
use super::session::SessionRecord;
use crate::db::backend::BackendError;

/// Closed status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    AlreadyFinished,
    NotFound,
    TerminateError,
    ConnectionError,
    ArgumentError,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::AlreadyFinished => "already_finished",
            Status::NotFound => "not_found",
            Status::TerminateError => "terminate_error",
            Status::ConnectionError => "connection_error",
            Status::ArgumentError => "argument_error",
        }
    }

    /// Process exit code. Automation can branch on this without parsing the
    /// JSON record.
    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Success | Status::AlreadyFinished => 0,
            Status::TerminateError => 1,
            Status::NotFound => 2,
            Status::ConnectionError => 3,
            Status::ArgumentError => 4,
        }
    }
}

/// Fields of the session that was acted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedSession {
    pub session_id: u64,
    pub user: String,
    pub host: String,
    pub database: Option<String>,
    pub statement: Option<String>,
    pub mode: KillMode,
}

impl MatchedSession {
    fn new(session: &SessionRecord, mode: KillMode) -> Self {
        Self {
            session_id: session.id,
            user: session.user.clone(),
            host: session.host.clone(),
            database: session.db.clone(),
            statement: session.info.clone(),
            mode,
        }
    }
}

/// The single externally reported outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub status: Status,
    pub message: String,
    #[serde(flatten)]
    pub session: Option<MatchedSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_logged: Option<bool>,
}

impl Report {
    fn new(status: Status, message: String) -> Self {
        Self {
            status,
            message,
            session: None,
            audit_logged: None,
        }
    }

    pub fn argument_error(err: &ArgumentError) -> Self {
        Self::new(Status::ArgumentError, err.to_string())
    }

    pub fn connection_error(host: &str, err: &BackendError) -> Self {
        Self::new(
            Status::ConnectionError,
            format!("Could not connect to MySQL host '{}' or list its sessions: {}", host, err),
        )
    }

    pub fn not_found(criteria: &MatchCriteria) -> Self {
        Self::new(
            Status::NotFound,
            format!(
                "No active query found matching: '{}' (original input: '{}')",
                criteria.fragment(),
                criteria.raw()
            ),
        )
    }

    /// Report for a matched session after the kill attempt
    pub fn from_termination(
        matched: &SessionRecord,
        mode: KillMode,
        outcome: &TerminationOutcome,
        audit: &AuditStatus,
        already_gone: AlreadyGonePolicy,
    ) -> Self {
        let (status, message) = match outcome {
            TerminationOutcome::Terminated { session, mode } => {
                let mut message = format!(
                    "Killed {} of session {}",
                    mode.as_str(),
                    session.id
                );
                if let AuditStatus::Failed(_) = audit {
                    message.push_str(" (audit log write failed, see diagnostics)");
                }
                (Status::Success, message)
            }
            TerminationOutcome::AlreadyGone { session_id } => {
                let status = match already_gone {
                    AlreadyGonePolicy::AlreadyFinished => Status::AlreadyFinished,
                    AlreadyGonePolicy::Success => Status::Success,
                };
                (
                    status,
                    format!(
                        "Session {} was no longer running when the kill was sent; it may have already finished",
                        session_id
                    ),
                )
            }
            TerminationOutcome::PermissionDenied { session_id, detail } => (
                Status::TerminateError,
                format!(
                    "Not permitted to kill session {}. The user needs SUPER or CONNECTION_ADMIN. {}",
                    session_id, detail
                ),
            ),
            TerminationOutcome::TerminationFailed { session_id, cause } => (
                Status::TerminateError,
                format!("Failed to kill session {}: {}", session_id, cause),
            ),
        };

        Self {
            status,
            message,
            session: Some(MatchedSession::new(matched, mode)),
            audit_logged: outcome.is_terminated().then(|| audit.is_logged()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            // Still one parseable record
            Err(e) => format!(
                r#"{{"status":"{}","message":"failed to serialize report: {}"}}"#,
                self.status.as_str(),
                e.to_string().replace('"', "'")
            ),
        }
    }

    /// Write the report as one JSON line on stdout
    pub fn emit(&self) {
        println!("{}", self.to_json());
    }
}
