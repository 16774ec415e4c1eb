//! Model architectures executed with ONNX Runtime

pub mod clustering;
