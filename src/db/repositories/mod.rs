//! Repositories over the local SQLite database

pub mod audit_log;
