//! Database module: backend traits, the MySQL server, and the audit stores

pub mod backend;
pub mod connection;
pub mod mysql;
pub mod repositories;
pub mod schema;

pub use backend::{AuditRecord, AuditStore, BackendError, LogEntry, SessionSource};
pub use connection::Database;
pub use mysql::{AuditTable, MySqlAuditLog, MySqlServer, ServerSettings};
pub use repositories::audit_log::SqliteAuditLog;
