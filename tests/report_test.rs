// Tests for outcome classification and reporting

mod common;

use common::record;
use querykill::core::audit::AuditStatus;
use querykill::core::terminator::{
    classify_kill_error, ER_KILL_DENIED_ERROR, ER_NO_SUCH_THREAD, ER_SPECIFIC_ACCESS_DENIED_ERROR,
};
use querykill::core::{
    AlreadyGonePolicy, ArgumentError, KillMode, MatchCriteria, Report, Status, TerminationOutcome,
};
use querykill::db::BackendError;

#[test]
fn test_exit_codes() {
    assert_eq!(Status::Success.exit_code(), 0);
    assert_eq!(Status::AlreadyFinished.exit_code(), 0);
    assert_eq!(Status::TerminateError.exit_code(), 1);
    assert_eq!(Status::NotFound.exit_code(), 2);
    assert_eq!(Status::ConnectionError.exit_code(), 3);
    assert_eq!(Status::ArgumentError.exit_code(), 4);
}

#[test]
fn test_classify_kill_errors() {
    let gone = classify_kill_error(5, &BackendError::server(Some(ER_NO_SUCH_THREAD), "Unknown thread id: 5"));
    assert_eq!(gone, TerminationOutcome::AlreadyGone { session_id: 5 });

    for code in [ER_KILL_DENIED_ERROR, ER_SPECIFIC_ACCESS_DENIED_ERROR] {
        let denied = classify_kill_error(5, &BackendError::server(Some(code), "denied"));
        assert!(matches!(denied, TerminationOutcome::PermissionDenied { session_id: 5, .. }));
    }

    let failed = classify_kill_error(5, &BackendError::server(Some(2013), "Lost connection"));
    match failed {
        TerminationOutcome::TerminationFailed { session_id, cause } => {
            assert_eq!(session_id, 5);
            assert!(cause.contains("2013"));
            assert!(cause.contains("Lost connection"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let failed = classify_kill_error(5, &BackendError::Connection("reset".into()));
    assert!(matches!(failed, TerminationOutcome::TerminationFailed { .. }));
}

#[test]
fn test_argument_error_record() {
    let report = Report::argument_error(&ArgumentError::Missing("host"));
    assert_eq!(report.status, Status::ArgumentError);

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["status"], "argument_error");
    assert!(json["message"].as_str().unwrap().contains("host"));
    assert!(json.get("session_id").is_none());
    assert!(json.get("audit_logged").is_none());
}

#[test]
fn test_not_found_record() {
    let criteria = MatchCriteria::new("SELECT * FROM t;", false).unwrap();
    let report = Report::not_found(&criteria);

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["status"], "not_found");
    assert_eq!(
        json["message"],
        "No active query found matching: 'select * from t' (original input: 'SELECT * FROM t;')"
    );
}

#[test]
fn test_terminated_record_carries_session_fields() {
    let session = record(7, "Query", Some("SELECT * FROM big_table"));
    let outcome = TerminationOutcome::Terminated {
        session: session.clone(),
        mode: KillMode::Query,
    };

    let report = Report::from_termination(
        &session,
        KillMode::Query,
        &outcome,
        &AuditStatus::Logged,
        AlreadyGonePolicy::AlreadyFinished,
    );

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["session_id"], 7);
    assert_eq!(json["user"], "app");
    assert_eq!(json["host"], "10.0.0.5:51234");
    assert_eq!(json["database"], "shop");
    assert_eq!(json["statement"], "SELECT * FROM big_table");
    assert_eq!(json["mode"], "query");
    assert_eq!(json["audit_logged"], true);
}

#[test]
fn test_audit_failure_only_changes_message() {
    let session = record(7, "Query", Some("SELECT 1"));
    let outcome = TerminationOutcome::Terminated {
        session: session.clone(),
        mode: KillMode::Query,
    };

    let logged = Report::from_termination(
        &session,
        KillMode::Query,
        &outcome,
        &AuditStatus::Logged,
        AlreadyGonePolicy::AlreadyFinished,
    );
    let failed = Report::from_termination(
        &session,
        KillMode::Query,
        &outcome,
        &AuditStatus::Failed("disk full".into()),
        AlreadyGonePolicy::AlreadyFinished,
    );

    assert_eq!(logged.status, failed.status);
    assert_eq!(logged.exit_code(), failed.exit_code());
    assert_eq!(failed.audit_logged, Some(false));
}

#[test]
fn test_session_without_database_reports_null() {
    let mut session = record(8, "Query", Some("SELECT 1"));
    session.db = None;
    let outcome = TerminationOutcome::TerminationFailed {
        session_id: 8,
        cause: "boom".into(),
    };

    let report = Report::from_termination(
        &session,
        KillMode::Connection,
        &outcome,
        &AuditStatus::Skipped,
        AlreadyGonePolicy::AlreadyFinished,
    );

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["status"], "terminate_error");
    assert!(json["database"].is_null());
    assert!(json.get("audit_logged").is_none());
}
