//! MySQL session source and audit store
//!
//! One connection is opened per run and shared by the session source and the
//! MySQL audit store. `close()` ends it gracefully; on any other exit path the
//! connection is released when the last handle is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Connection, Executor, Row};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::backend::{AuditRecord, AuditStore, BackendError, LogEntry, SessionSource};
use super::schema::{mysql_schema, AUDIT_TABLE};
use crate::core::error::ArgumentError;
use crate::core::outcome::KillMode;
use crate::core::session::SessionRecord;

/// Statement used to take the snapshot
pub const LISTING_QUERY: &str = "SELECT CAST(ID AS UNSIGNED) AS id, USER AS user, HOST AS host, \
     DB AS db, COMMAND AS command, CAST(TIME AS SIGNED) AS time, STATE AS state, INFO AS info \
     FROM information_schema.PROCESSLIST";

/// Where and as whom to connect
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ServerSettings {
    /// `host:port`, used in messages
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }
}

/// Map a driver error into a backend error, keeping the MySQL error number
pub fn map_sqlx_error(err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number());
            BackendError::server(code, db_err.message())
        }
        sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::Configuration(_) => {
            BackendError::Connection(err.to_string())
        }
        other => BackendError::server(None, other.to_string()),
    }
}

/// `KILL QUERY <id>` or `KILL CONNECTION <id>`
pub fn kill_statement(session_id: u64, mode: KillMode) -> String {
    match mode {
        KillMode::Query => format!("KILL QUERY {}", session_id),
        KillMode::Connection => format!("KILL CONNECTION {}", session_id),
    }
}

/// A live connection to the target server
#[derive(Clone)]
pub struct MySqlServer {
    conn: Arc<Mutex<Option<MySqlConnection>>>,
    label: String,
}

impl MySqlServer {
    /// Open the connection. Failure here is a connection error.
    pub async fn connect(settings: &ServerSettings) -> Result<Self, BackendError> {
        let label = settings.label();
        let conn = MySqlConnection::connect_with(&settings.connect_options())
            .await
            .map_err(|e| match map_sqlx_error(e) {
                // Authentication failures arrive as server errors; before a
                // session exists they are all connection problems.
                BackendError::Server { code, message } => BackendError::Connection(match code {
                    Some(code) => format!("{} ({})", message, code),
                    None => message,
                }),
                other => other,
            })?;

        info!("Connected to MySQL at {}", label);

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            label,
        })
    }

    /// Close the connection gracefully. Later calls fail with a connection
    /// error.
    pub async fn close(&self) {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            match conn.close().await {
                Ok(()) => debug!("Closed connection to {}", self.label),
                Err(e) => warn!("Error closing connection to {}: {}", self.label, e),
            }
        }
    }

    async fn lock(&self) -> MutexGuard<'_, Option<MySqlConnection>> {
        self.conn.lock().await
    }

    fn map_row(row: &MySqlRow) -> Result<SessionRecord, sqlx::Error> {
        Ok(SessionRecord {
            id: row.try_get("id")?,
            user: row.try_get("user")?,
            host: row.try_get("host")?,
            db: row.try_get("db")?,
            command: row.try_get("command")?,
            time_secs: row.try_get::<Option<i64>, _>("time")?.unwrap_or_default(),
            state: row.try_get("state")?,
            info: row.try_get("info")?,
        })
    }
}

fn closed() -> BackendError {
    BackendError::Connection("connection is closed".to_string())
}

#[async_trait]
impl SessionSource for MySqlServer {
    fn listing_statement(&self) -> &str {
        LISTING_QUERY
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError> {
        let mut guard = self.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let rows = sqlx::query(LISTING_QUERY)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        let sessions = rows
            .iter()
            .map(Self::map_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)?;

        Ok(sessions)
    }

    async fn kill(&self, session_id: u64, mode: KillMode) -> Result<(), BackendError> {
        let sql = kill_statement(session_id, mode);

        let mut guard = self.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        // No bind arguments: sent over the text protocol, since KILL is not
        // preparable on every server version
        (&mut *conn)
            .execute(sql.as_str())
            .await
            .map_err(map_sqlx_error)?;

        debug!("Sent '{}'", sql);
        Ok(())
    }
}

/// Validated, quoted audit table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTable {
    database: Option<String>,
    table: String,
}

impl AuditTable {
    pub fn new(database: Option<&str>, table: Option<&str>) -> Result<Self, ArgumentError> {
        let table = table.unwrap_or(AUDIT_TABLE);
        validate_identifier("audit.table", table)?;
        if let Some(db) = database {
            validate_identifier("audit.database", db)?;
        }

        Ok(Self {
            database: database.map(str::to_string),
            table: table.to_string(),
        })
    }

    /// Backtick-quoted, optionally database-qualified name
    pub fn qualified(&self) -> String {
        match &self.database {
            Some(db) => format!("`{}`.`{}`", db, self.table),
            None => format!("`{}`", self.table),
        }
    }
}

impl Default for AuditTable {
    fn default() -> Self {
        Self {
            database: None,
            table: AUDIT_TABLE.to_string(),
        }
    }
}

fn validate_identifier(field: &'static str, name: &str) -> Result<(), ArgumentError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if valid {
        Ok(())
    } else {
        Err(ArgumentError::Invalid {
            field,
            reason: format!("'{}' is not a plain MySQL identifier", name),
        })
    }
}

/// Audit store in a table on the target server, written over the same
/// connection that issued the kill
pub struct MySqlAuditLog {
    server: MySqlServer,
    table: AuditTable,
}

impl MySqlAuditLog {
    pub fn new(server: MySqlServer, table: AuditTable) -> Self {
        Self { server, table }
    }

    fn map_row(row: &MySqlRow) -> Result<AuditRecord, sqlx::Error> {
        Ok(AuditRecord {
            id: row.try_get("id")?,
            entry: LogEntry {
                session_id: row.try_get("session_id")?,
                statement: row.try_get("query_text")?,
                host: row.try_get("host")?,
                user: row.try_get("user")?,
                db_name: row.try_get("db_name")?,
                killed_by: row.try_get("killed_by_user")?,
            },
            killed_at: row.try_get::<DateTime<Utc>, _>("killed_at")?,
        })
    }
}

#[async_trait]
impl AuditStore for MySqlAuditLog {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    async fn ensure_schema(&self) -> Result<(), BackendError> {
        let ddl = mysql_schema(&self.table.qualified());

        let mut guard = self.server.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        (&mut *conn)
            .execute(ddl.as_str())
            .await
            .map_err(map_sqlx_error)?;

        info!("Audit table {} is ready", self.table.qualified());
        Ok(())
    }

    async fn record(&self, entry: &LogEntry) -> Result<(), BackendError> {
        let sql = format!(
            "INSERT INTO {} (session_id, query_text, host, user, db_name, killed_by_user) \
             VALUES (?, ?, ?, ?, ?, ?)",
            self.table.qualified()
        );

        let mut guard = self.server.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        sqlx::query(&sql)
            .bind(entry.session_id)
            .bind(&entry.statement)
            .bind(&entry.host)
            .bind(&entry.user)
            .bind(&entry.db_name)
            .bind(&entry.killed_by)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, BackendError> {
        let sql = format!(
            "SELECT CAST(id AS SIGNED) AS id, session_id, query_text, host, user, db_name, \
             killed_by_user, killed_at FROM {} ORDER BY killed_at DESC, id DESC LIMIT ?",
            self.table.qualified()
        );

        let mut guard = self.server.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let rows = sqlx::query(&sql)
            .bind(u64::try_from(limit).unwrap_or(u64::MAX))
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        let records = rows
            .iter()
            .map(Self::map_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)?;

        Ok(records)
    }
}
