//! Unified error types for the ONNX binding library

use thiserror::Error;

/// Unified error type for the library
#[derive(Debug, Error)]
pub enum UnifiedError {
    /// Interchange artifact missing or not a valid graph
    #[error("Failed to load model from '{model_path}': {message}")]
    Load { model_path: String, message: String },

    /// Write failure while exporting
    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    /// A pipeline stage has no graph representation
    #[error("Cannot convert '{stage}' to ONNX: {reason}")]
    Conversion { stage: String, reason: String },

    /// An input tensor does not match its declared slot
    #[error("Shape mismatch for input '{input}': expected {expected}, got {actual}")]
    ShapeMismatch {
        input: String,
        expected: String,
        actual: String,
    },

    /// Configuration error
    #[error("Configuration error for '{field}': {message}")]
    Config { field: String, message: String },

    /// Inference error
    #[error("Inference error during '{operation}': {message}")]
    Inference { operation: String, message: String },

    /// ONNX Runtime error
    #[error("ONNX Runtime error: {message}")]
    OrtError { message: String },
}

/// Result type alias using UnifiedError
pub type UnifiedResult<T> = Result<T, UnifiedError>;

/// Helper functions for creating errors
pub mod errors {
    use super::UnifiedError;

    pub fn model_load(model_path: &str, source: &str) -> UnifiedError {
        UnifiedError::Load {
            model_path: model_path.to_string(),
            message: source.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> UnifiedError {
        model_load(path, "file not found")
    }

    pub fn io_error(path: &str, source: &str) -> UnifiedError {
        UnifiedError::Io {
            path: path.to_string(),
            message: source.to_string(),
        }
    }

    pub fn conversion_error(stage: &str, reason: &str) -> UnifiedError {
        UnifiedError::Conversion {
            stage: stage.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn shape_mismatch(input: &str, expected: &str, actual: &str) -> UnifiedError {
        UnifiedError::ShapeMismatch {
            input: input.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn config_error(field: &str, message: &str) -> UnifiedError {
        UnifiedError::Config {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn inference_error(operation: &str, source: &str) -> UnifiedError {
        UnifiedError::Inference {
            operation: operation.to_string(),
            message: source.to_string(),
        }
    }

    pub fn ort_error(source: &str) -> UnifiedError {
        UnifiedError::OrtError {
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = errors::shape_mismatch("Alcohol", "[N, 1]", "[1, 2]");
        assert_eq!(
            err.to_string(),
            "Shape mismatch for input 'Alcohol': expected [N, 1], got [1, 2]"
        );

        let err = errors::file_not_found("model.onnx");
        assert!(matches!(err, UnifiedError::Load { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to load model from 'model.onnx': file not found"
        );
    }
}
