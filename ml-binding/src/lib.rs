//! ML Binding for the wine clustering pipeline
//!
//! Loads the wine chemistry dataset, assembles feature vectors and fits a
//! k-means model with linfa.
//!
//! ## Architecture
//! - **Loading**: lazy CSV reader mapping rows positionally onto [`WineRecord`]
//! - **Features**: ordered column concatenation ([`FeatureAssembler`])
//! - **Training**: `linfa-clustering` KMeans with a seeded RNG
//! - **Inference**: nearest centroid lookup via linfa-nn Ball Tree
//!
//! Fitted pipelines are persisted as a zip archive holding JSON model data
//! and the training schema.

pub mod archive;
pub mod dataset;
pub mod error;
pub mod features;
pub mod kmeans;
pub mod pipeline;

// Re-exports for convenience
pub use archive::{load_archive, save_archive};
pub use dataset::{load_records, write_records, RecordReader, WineRecord, WINE_COLUMNS};
pub use error::{MlError, MlResult};
pub use features::{FeatureAssembler, DEFAULT_FEATURE_COLUMN};
pub use kmeans::{ClusterAssignment, KMeansModel, KMeansTrainer};
pub use pipeline::{ClusteringPipeline, ColumnSchema, DatasetSchema, FittedPipeline};
