//! # Scheme Errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by scheme mutation and persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemeError {
    /// Reading or writing the scheme file failed.
    #[error("I/O error on {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    /// The scheme file is not a JSON object.
    #[error("invalid scheme JSON: {0}")]
    Json(String),

    /// A component entry lacks `name`, `type` or `module`.
    #[error("component entry missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("component name already taken: {0}")]
    NameTaken(String),
}

impl SchemeError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
