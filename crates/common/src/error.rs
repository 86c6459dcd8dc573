//! Common error types for pipemedic.

use thiserror::Error;

/// Common error type for pipemedic operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pattern in rule '{rule}': {pattern} - {source}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("History store error: {0}")]
    History(String),

    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    #[error("Script timed out after {seconds}s")]
    ScriptTimeout { seconds: u64 },
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;
