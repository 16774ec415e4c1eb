//! ONNX binding for the wine clustering pipeline
//!
//! Exports fitted k-means pipelines to ONNX and runs them with ONNX Runtime.
//!
//! ## Features
//! - **Export**: per-column graph inputs named after the training schema
//! - **Inference**: input validation against the graph's declared slots
//! - **CPU Support**: Via default ONNX Runtime
//! - **NVIDIA GPU Support**: Via CUDA execution provider (`cuda` feature)
//! - **Reporting**: typed output tensors printed one line per output

pub mod core;
pub mod export;
pub mod model_architectures;
pub mod report;

// Re-export commonly used types
pub use core::unified_error::{UnifiedError, UnifiedResult};

// Export types
pub use export::{
    build_model, export_onnx, read_model, InterchangeSignature, TensorSignature,
    PREDICTED_LABEL_OUTPUT, SCORE_OUTPUT,
};

// Session types
pub use model_architectures::clustering::{
    ClusteringSession, ElementClass, ExecutionProvider, FeedPlan, InputTensor, OnnxPrediction,
    TensorSlot,
};

// Reporting
pub use report::{describe, report_outputs, NamedOutput, OutputTensor};
