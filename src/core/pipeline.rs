//! The find → kill → audit → report pipeline
//!
//! Listing → Matching → {NoMatch, Matched} → Terminating → (Terminated →
//! Logging) → Reporting. Every branch returns a [`Report`]; nothing here
//! returns an error.

use tracing::{debug, info};

use super::audit::{AuditLogger, AuditStatus};
use super::matcher::{MatchCriteria, QueryMatcher};
use super::outcome::{AlreadyGonePolicy, KillMode};
use super::report::Report;
use super::snapshot::fetch_snapshot;
use super::terminator::terminate;
use crate::db::backend::{AuditStore, SessionSource};

/// Everything one run needs besides the backends
#[derive(Debug, Clone)]
pub struct KillRequest {
    pub criteria: MatchCriteria,
    pub mode: KillMode,
    pub already_gone: AlreadyGonePolicy,
    /// Administrator identity recorded in the audit log
    pub killed_by: String,
    /// Host label used in messages
    pub server_label: String,
}

/// Run one invocation against already-connected backends
pub async fn run_kill(
    source: &dyn SessionSource,
    audit: &dyn AuditStore,
    request: &KillRequest,
) -> Report {
    let snapshot = match fetch_snapshot(source).await {
        Ok(snapshot) => snapshot,
        Err(e) => return Report::connection_error(&request.server_label, &e),
    };

    let matcher = QueryMatcher::new(request.criteria.clone(), source.listing_statement());
    let Some(matched) = matcher.find(&snapshot).cloned() else {
        info!(
            "No active query among {} sessions matches '{}'",
            snapshot.len(),
            request.criteria.fragment()
        );
        return Report::not_found(&request.criteria);
    };
    drop(snapshot);

    info!(
        "Found matching query (id {}): user {}, host {}, db {}, time {}s, state {}",
        matched.id,
        matched.user,
        matched.host,
        matched.db.as_deref().unwrap_or("-"),
        matched.time_secs,
        matched.state.as_deref().unwrap_or("-")
    );

    let outcome = terminate(source, &matched, request.mode).await;
    debug!("Termination outcome: {:?}", outcome);

    let audit_status = if outcome.is_terminated() {
        AuditLogger::new(audit, &request.killed_by).log(&outcome).await
    } else {
        AuditStatus::Skipped
    };

    Report::from_termination(
        &matched,
        request.mode,
        &outcome,
        &audit_status,
        request.already_gone,
    )
}
