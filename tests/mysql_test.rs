// Tests for the MySQL backend helpers that need no server

use querykill::core::KillMode;
use querykill::db::mysql::{kill_statement, map_sqlx_error, LISTING_QUERY};
use querykill::db::schema::mysql_schema;
use querykill::db::{
    AuditStore, AuditTable, BackendError, MySqlAuditLog, MySqlServer, ServerSettings, SessionSource,
};

fn assert_session_source<T: SessionSource + Send + Sync + 'static>() {}

fn assert_audit_store<T: AuditStore + Send + Sync + 'static>() {}

#[test]
fn test_kill_statement_per_mode() {
    assert_eq!(kill_statement(42, KillMode::Query), "KILL QUERY 42");
    assert_eq!(kill_statement(42, KillMode::Connection), "KILL CONNECTION 42");
}

#[test]
fn test_audit_table_names() {
    assert_eq!(AuditTable::default().qualified(), "`killed_queries_log`");
    assert_eq!(
        AuditTable::new(Some("ops"), None).unwrap().qualified(),
        "`ops`.`killed_queries_log`"
    );
    assert_eq!(
        AuditTable::new(None, Some("kills_2026")).unwrap().qualified(),
        "`kills_2026`"
    );
}

#[test]
fn test_audit_table_rejects_unsafe_identifiers() {
    assert!(AuditTable::new(Some("ops`; DROP"), None).is_err());
    assert!(AuditTable::new(None, Some("")).is_err());
    assert!(AuditTable::new(None, Some("a.b")).is_err());
    assert!(AuditTable::new(None, Some("x".repeat(65).as_str())).is_err());
}

#[test]
fn test_schema_uses_qualified_table() {
    let ddl = mysql_schema("`ops`.`killed_queries_log`");
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS `ops`.`killed_queries_log`"));
    assert!(ddl.contains("killed_by_user"));
    assert!(ddl.contains("DEFAULT CURRENT_TIMESTAMP"));
}

#[test]
fn test_listing_query_reads_processlist() {
    assert!(LISTING_QUERY.contains("information_schema.PROCESSLIST"));
    for column in ["id", "user", "host", "db", "command", "time", "state", "info"] {
        assert!(LISTING_QUERY.contains(&format!("AS {}", column)), "missing {}", column);
    }
}

#[test]
fn test_driver_errors_without_server_code() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
    assert!(matches!(
        map_sqlx_error(sqlx::Error::Io(io)),
        BackendError::Connection(_)
    ));

    let err = map_sqlx_error(sqlx::Error::RowNotFound);
    assert_eq!(err.code(), None);
    assert!(matches!(err, BackendError::Server { .. }));
}

#[test]
fn test_server_label() {
    let settings = ServerSettings {
        host: "db1".to_string(),
        port: 3306,
        user: "root".to_string(),
        password: String::new(),
    };
    assert_eq!(settings.label(), "db1:3306");
}

#[test]
fn test_server_backends_are_thread_safe() {
    assert_session_source::<MySqlServer>();
    assert_audit_store::<MySqlAuditLog>();
}
