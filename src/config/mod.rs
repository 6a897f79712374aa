//! querykill configuration module
//! Handles loading the YAML config file

pub mod config;

pub use config::{
    ApiConfig, AuditBackend, AuditConfig, Config, MatchingConfig, ServerConfig, TerminationConfig,
};
