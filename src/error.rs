//! Error types for utsynth

use crate::completion::CompletionError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// utsynth errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Trace error: {0}")]
    Trace(String),

    #[error("No recorded call covers {file}:{line}")]
    TargetNotFound { file: String, line: u32 },

    #[error("Malformed case descriptor `{line}`: {reason}")]
    CaseDescriptor { line: String, reason: String },

    #[error("Case enumeration error: {0}")]
    Enumeration(String),

    #[error("Case `{case}` cannot move from {from} to {to}")]
    CaseState {
        case: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Source parse error: {0}")]
    SourceParse(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Build/run error: {0}")]
    Run(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
