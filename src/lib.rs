//! querykill - find a running MySQL statement by its text, kill it, and keep an audit trail

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
