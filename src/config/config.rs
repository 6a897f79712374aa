//! querykill configuration
//!
//! Every value has a default, so the file is optional. Command-line flags
//! override whatever is loaded here.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::outcome::{AlreadyGonePolicy, KillMode};
use crate::db::schema::AUDIT_TABLE;

/// querykill configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target server
    #[serde(default)]
    pub server: ServerConfig,

    /// Fragment matching
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Kill behaviour
    #[serde(default)]
    pub termination: TerminationConfig,

    /// Audit log destination
    #[serde(default)]
    pub audit: AuditConfig,

    /// HTTP front end (`querykill serve`)
    #[serde(default)]
    pub api: ApiConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Empty means "must be given on the command line"
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3306
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminationConfig {
    /// `query` stops the statement, `connection` drops the session
    #[serde(default)]
    pub mode: KillMode,
    /// How a session that ended before the kill is reported
    #[serde(default)]
    pub already_gone: AlreadyGonePolicy,
}

/// Where audit records go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    /// Table on the target server
    #[default]
    Mysql,
    /// Local SQLite file
    Sqlite,
}

impl AuditBackend {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "mysql" => Ok(AuditBackend::Mysql),
            "sqlite" => Ok(AuditBackend::Sqlite),
            _ => anyhow::bail!("Unknown audit backend: {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub backend: AuditBackend,

    /// Database holding the MySQL audit table
    #[serde(default)]
    pub database: Option<String>,

    /// MySQL audit table name
    #[serde(default = "default_table")]
    pub table: String,

    /// SQLite audit file
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_table() -> String {
    AUDIT_TABLE.to_string()
}

fn default_sqlite_path() -> String {
    "~/.querykill/audit.db".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackend::default(),
            database: None,
            table: default_table(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address `serve` listens on
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:3001".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load config from the given path or the default location.
    ///
    /// A missing file yields the defaults; nothing is written.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            debug!("Config file {:?} not found, using defaults", config_path);
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;

        let config = Self::from_yaml(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".querykill").join("config.yml"))
    }

    /// Resolve the SQLite audit path (expand ~)
    pub fn resolve_sqlite_path(&self) -> Result<PathBuf> {
        expand_home(&self.audit.sqlite_path)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir().context("Cannot find home directory")?;
            Ok(home.join(rest.trim_start_matches('/')))
        }
        None => Ok(PathBuf::from(path)),
    }
}
