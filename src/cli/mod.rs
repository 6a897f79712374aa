//! CLI module

pub mod commands;
pub mod serve;

/// Run the CLI and return the process exit code
pub fn run() -> i32 {
    commands::run()
}
