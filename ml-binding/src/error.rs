//! Error types for dataset loading, training and native persistence

use thiserror::Error;

/// Errors raised by the ML binding
#[derive(Debug, Error)]
pub enum MlError {
    /// Input file missing, malformed row, or unreadable archive
    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    /// Write failure while persisting an artifact
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid pipeline configuration (unknown column, bad hyperparameter)
    #[error("Configuration error for '{field}': {message}")]
    Config { field: String, message: String },

    /// The clustering library rejected the data or parameters
    #[error("Training failed: {0}")]
    Training(String),

    #[error("Model not trained")]
    NotTrained,

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Result type alias using MlError
pub type MlResult<T> = Result<T, MlError>;

impl MlError {
    pub fn load(path: impl Into<String>, reason: impl ToString) -> Self {
        MlError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        MlError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        MlError::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}
