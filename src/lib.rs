//! Wine clustering workflow
//!
//! Fits a k-means model on wine chemistry measurements, saves it as a native
//! archive, exports it to ONNX and checks that ONNX Runtime reproduces the
//! native cluster assignments.

pub mod config;
pub mod samples;
pub mod workflow;

pub use config::PipelineConfig;
pub use samples::builtin_samples;
pub use workflow::{
    open_session, run_pipeline, verify_prediction, PipelineReport, PredictionMismatch,
    SampleOutcome, Stage, StageError,
};
