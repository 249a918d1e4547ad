//! Error handling for instance provisioning
//!
//! Provides the error type shared by every provisioning step. Each variant
//! corresponds to one failure kind an install or update can terminate with.

use thiserror::Error;

/// Main error type for provisioning operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// IO errors (reading scripts, writing artifacts, removing the tree)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Options file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or malformed options
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external instance scaffolding tool exited unsuccessfully
    #[error("Instance scaffolding failed (exit code {}): {stderr}", display_code(.status))]
    Scaffold {
        /// Exit code, `None` when terminated by a signal
        status: Option<i32>,
        /// Captured standard error of the tool
        stderr: String,
    },

    /// Template parsing or rendering errors
    #[error("Template error: {0}")]
    Template(String),

    /// Generated launcher script could not be patched
    #[error("Script error: {0}")]
    Script(String),

    /// Malformed include directive; carries the original token
    #[error("Invalid zcml: {0}")]
    InvalidInclude(String),
}

fn display_code(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a script patching error
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    /// Create an invalid include directive error
    pub fn invalid_include(token: impl Into<String>) -> Self {
        Self::InvalidInclude(token.into())
    }
}

impl From<minijinja::Error> for ProvisionError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}
