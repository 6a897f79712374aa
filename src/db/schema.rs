//! SQL schema definitions

/// Audit table name shared by both stores
pub const AUDIT_TABLE: &str = "killed_queries_log";

/// Local SQLite audit store
pub const SQLITE_SCHEMA: &str = r#"
-- One row per terminated statement
CREATE TABLE IF NOT EXISTS killed_queries_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    query_text TEXT,
    host TEXT NOT NULL,
    user TEXT NOT NULL,
    db_name TEXT,
    killed_by_user TEXT NOT NULL,
    killed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_killed_queries_log_killed_at ON killed_queries_log(killed_at);
"#;

/// MySQL audit table; `table` must already be a quoted, qualified name
pub fn mysql_schema(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    session_id BIGINT UNSIGNED NOT NULL,
    query_text LONGTEXT NULL,
    host VARCHAR(255) NOT NULL,
    user VARCHAR(255) NOT NULL,
    db_name VARCHAR(64) NULL,
    killed_by_user VARCHAR(255) NOT NULL,
    killed_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    KEY idx_killed_at (killed_at)
)
"#
    )
}
