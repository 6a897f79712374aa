//! Audit log repository backed by a local SQLite file

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use tokio::sync::OnceCell;

use crate::db::backend::{AuditRecord, AuditStore, BackendError, LogEntry};
use crate::db::Database;

/// SQLite audit store.
///
/// The file is opened on first use, so a broken audit path only surfaces
/// when an entry is actually written.
pub struct SqliteAuditLog {
    path: PathBuf,
    db: OnceCell<Database>,
}

impl SqliteAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            db: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn db(&self) -> Result<&Database, BackendError> {
        self.db
            .get_or_try_init(|| async {
                Database::new(&self.path).map_err(|e| BackendError::server(None, format!("{:#}", e)))
            })
            .await
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AuditRecord> {
        let session_id: i64 = row.get(1)?;
        let session_id = u64::try_from(session_id)
            .map_err(|e| FromSqlConversionFailure(1, Type::Integer, Box::new(e)))?;

        let killed_at: String = row.get(7)?;
        let killed_at = DateTime::parse_from_rfc3339(&killed_at)
            .map_err(|e| FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);

        Ok(AuditRecord {
            id: row.get(0)?,
            entry: LogEntry {
                session_id,
                statement: row.get(2)?,
                host: row.get(3)?,
                user: row.get(4)?,
                db_name: row.get(5)?,
                killed_by: row.get(6)?,
            },
            killed_at,
        })
    }
}

fn sqlite_error(e: rusqlite::Error) -> BackendError {
    let code = match &e {
        rusqlite::Error::SqliteFailure(err, _) => u16::try_from(err.extended_code).ok(),
        _ => None,
    };
    BackendError::server(code, e.to_string())
}

#[async_trait]
impl AuditStore for SqliteAuditLog {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), BackendError> {
        // Opening applies the schema
        self.db().await.map(|_| ())
    }

    async fn record(&self, entry: &LogEntry) -> Result<(), BackendError> {
        let session_id = i64::try_from(entry.session_id)
            .map_err(|_| BackendError::server(None, format!("Session id {} out of range", entry.session_id)))?;

        let db = self.db().await?;
        let conn = db.lock().await;
        conn.execute(
            "INSERT INTO killed_queries_log (session_id, query_text, host, user, db_name, killed_by_user)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                entry.statement,
                entry.host,
                entry.user,
                entry.db_name,
                entry.killed_by,
            ],
        )
        .map_err(sqlite_error)?;

        tracing::debug!("Inserted audit row for session {}", entry.session_id);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, BackendError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let db = self.db().await?;
        let conn = db.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, query_text, host, user, db_name, killed_by_user, killed_at
                 FROM killed_queries_log
                 ORDER BY killed_at DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(sqlite_error)?;

        let rows = stmt
            .query_map(params![limit], Self::map_row)
            .map_err(sqlite_error)?;

        let records = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_error)?;

        Ok(records)
    }
}
