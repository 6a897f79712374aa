//! Caller input errors

/// Invalid or missing input, detected before any connection attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Missing required argument: {0}")]
    Missing(&'static str),

    #[error("Query text is empty after removing the trailing ';'")]
    EmptyFragment,

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
