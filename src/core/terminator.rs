//! Statement termination and error classification

use tracing::{info, warn};

use super::outcome::{KillMode, TerminationOutcome};
use super::session::SessionRecord;
use crate::db::backend::{BackendError, SessionSource};

/// MySQL `ER_NO_SUCH_THREAD`: "Unknown thread id"
pub const ER_NO_SUCH_THREAD: u16 = 1094;
/// MySQL `ER_KILL_DENIED_ERROR`: "You are not owner of thread"
pub const ER_KILL_DENIED_ERROR: u16 = 1095;
/// MySQL `ER_SPECIFIC_ACCESS_DENIED_ERROR`: missing SUPER / CONNECTION_ADMIN
pub const ER_SPECIFIC_ACCESS_DENIED_ERROR: u16 = 1227;

/// Send exactly one kill for `session` and classify the answer.
/// Never retries.
pub async fn terminate(
    source: &dyn SessionSource,
    session: &SessionRecord,
    mode: KillMode,
) -> TerminationOutcome {
    info!(
        "Killing {} of session {} (user {}, host {})",
        mode.as_str(),
        session.id,
        session.user,
        session.host
    );

    match source.kill(session.id, mode).await {
        Ok(()) => TerminationOutcome::Terminated {
            session: session.clone(),
            mode,
        },
        Err(err) => {
            let outcome = classify_kill_error(session.id, &err);
            warn!("Kill of session {} did not succeed: {}", session.id, err);
            outcome
        }
    }
}

/// Map a failed kill to an outcome
pub fn classify_kill_error(session_id: u64, err: &BackendError) -> TerminationOutcome {
    match err.code() {
        Some(ER_NO_SUCH_THREAD) => TerminationOutcome::AlreadyGone { session_id },
        Some(ER_KILL_DENIED_ERROR) | Some(ER_SPECIFIC_ACCESS_DENIED_ERROR) => {
            TerminationOutcome::PermissionDenied {
                session_id,
                detail: err.to_string(),
            }
        }
        _ => TerminationOutcome::TerminationFailed {
            session_id,
            cause: err.to_string(),
        },
    }
}
