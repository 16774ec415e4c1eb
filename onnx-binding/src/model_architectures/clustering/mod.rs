//! Clustering graphs exported from fitted pipelines

pub mod kmeans_session;
pub mod tensors;

pub use kmeans_session::{ClusteringSession, ExecutionProvider, OnnxPrediction};
pub use tensors::{check_feeds, format_dims, ElementClass, FeedPlan, InputTensor, TensorSlot};
