//! ONNX Runtime session for exported clustering graphs
//!
//! Supports CPU and, with the `cuda` feature, NVIDIA GPU execution. The
//! underlying runtime session is released when [`ClusteringSession`] drops.

use super::tensors::{check_feeds, ElementClass, FeedPlan, InputTensor, TensorSlot};
use crate::core::unified_error::{errors, UnifiedResult};
use crate::export::{PREDICTED_LABEL_OUTPUT, SCORE_OUTPUT};
use crate::report::{NamedOutput, OutputTensor};
use ml_wine_clustering::{FeatureAssembler, WineRecord};
use ort::session::{Session, SessionInputValue};
use ort::tensor::{PrimitiveTensorElementType, TensorElementType};
use ort::value::{DynValue, Tensor, ValueType};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Execution Provider
// ============================================================================

/// Execution provider preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Accelerator when compiled in, otherwise CPU
    #[default]
    Auto,
    /// Force CPU
    Cpu,
    /// NVIDIA GPU via CUDA
    Cuda,
}

fn element_class(ty: TensorElementType) -> ElementClass {
    match ty {
        TensorElementType::Float32 => ElementClass::Float,
        TensorElementType::Int8
        | TensorElementType::Int16
        | TensorElementType::Int32
        | TensorElementType::Int64
        | TensorElementType::Uint8
        | TensorElementType::Uint16
        | TensorElementType::Uint32
        | TensorElementType::Uint64 => ElementClass::Int,
        TensorElementType::Bool => ElementClass::Bool,
        other => ElementClass::Other(format!("{:?}", other)),
    }
}

fn slot_from_type(name: &str, value_type: &ValueType) -> TensorSlot {
    match value_type {
        ValueType::Tensor {
            ty,
            shape,
            dimension_symbols,
            ..
        } => {
            let dims: Vec<Option<i64>> =
                shape.iter().map(|&d| if d < 0 { None } else { Some(d) }).collect();
            let symbols = dims
                .iter()
                .enumerate()
                .map(|(i, d)| match d {
                    Some(_) => None,
                    None => dimension_symbols
                        .get(i)
                        .map(|s| s.to_string())
                        .filter(|s| !s.is_empty()),
                })
                .collect();
            TensorSlot::new(name, element_class(*ty), dims).with_symbols(symbols)
        }
        other => TensorSlot::new(name, ElementClass::Other(format!("{:?}", other)), Vec::new()),
    }
}

fn extract<T: PrimitiveTensorElementType + Clone>(value: &DynValue) -> Option<Vec<T>> {
    value
        .try_extract_tensor::<T>()
        .ok()
        .map(|(_, data)| data.to_vec())
}

fn widen<T: Copy>(values: Vec<T>, f: impl Fn(T) -> i64) -> OutputTensor {
    OutputTensor::Int(values.into_iter().map(f).collect())
}

/// Classify and copy out one output value; `None` when the runtime holds
/// no readable data for it
fn extract_output(value: &DynValue) -> Option<OutputTensor> {
    let ty = match value.dtype() {
        ValueType::Tensor { ty, .. } => *ty,
        other => return Some(OutputTensor::Unsupported(format!("{:?}", other))),
    };

    match ty {
        TensorElementType::Float32 => extract::<f32>(value).map(OutputTensor::Float),
        TensorElementType::Bool => extract::<bool>(value).map(OutputTensor::Bool),
        TensorElementType::Int64 => extract::<i64>(value).map(OutputTensor::Int),
        TensorElementType::Int32 => extract::<i32>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Int16 => extract::<i16>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Int8 => extract::<i8>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Uint32 => extract::<u32>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Uint16 => extract::<u16>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Uint8 => extract::<u8>(value).map(|v| widen(v, i64::from)),
        TensorElementType::Uint64 => extract::<u64>(value).map(|v| widen(v, |x| x as i64)),
        other => Some(OutputTensor::Unsupported(format!("{:?}", other))),
    }
}

// ============================================================================
// Clustering Session
// ============================================================================

/// Cluster assignment read back from the interchange graph
#[derive(Debug, Clone, PartialEq)]
pub struct OnnxPrediction {
    pub cluster_id: u32,
    pub scores: Vec<f32>,
    /// Every output in graph order, for reporting
    pub outputs: Vec<NamedOutput>,
}

impl OnnxPrediction {
    pub fn from_outputs(outputs: Vec<NamedOutput>) -> UnifiedResult<Self> {
        let find = |name: &str| outputs.iter().find(|o| o.name == name);

        let cluster_id = find(PREDICTED_LABEL_OUTPUT)
            .and_then(|o| o.ints())
            .and_then(|v| v.first().copied())
            .ok_or_else(|| {
                errors::inference_error("read_outputs", "PredictedLabel is missing or not an integer tensor")
            })?;
        let cluster_id = u32::try_from(cluster_id).map_err(|_| {
            errors::inference_error("read_outputs", &format!("cluster id {} out of range", cluster_id))
        })?;

        let scores = find(SCORE_OUTPUT)
            .and_then(|o| o.floats())
            .map(|v| v.to_vec())
            .ok_or_else(|| errors::inference_error("read_outputs", "Score is missing or not a float tensor"))?;

        Ok(Self {
            cluster_id,
            scores,
            outputs,
        })
    }
}

/// Loaded interchange graph
pub struct ClusteringSession {
    session: Session,
    model_path: String,
    inputs: Vec<TensorSlot>,
    outputs: Vec<TensorSlot>,
}

impl ClusteringSession {
    /// Load an exported ONNX file
    pub fn load<P: AsRef<Path>>(onnx_path: P, provider: ExecutionProvider) -> UnifiedResult<Self> {
        let model_path = onnx_path.as_ref().display().to_string();

        if !onnx_path.as_ref().is_file() {
            return Err(errors::file_not_found(&model_path));
        }

        let session = Self::create_session(onnx_path.as_ref(), provider)?;

        let inputs: Vec<TensorSlot> = session
            .inputs
            .iter()
            .map(|i| slot_from_type(&i.name, &i.input_type))
            .collect();
        let outputs: Vec<TensorSlot> = session
            .outputs
            .iter()
            .map(|o| slot_from_type(&o.name, &o.output_type))
            .collect();

        tracing::info!(
            path = %model_path,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "loaded ONNX session"
        );

        Ok(Self {
            session,
            model_path,
            inputs,
            outputs,
        })
    }

    fn cpu_session(onnx_path: &Path) -> UnifiedResult<Session> {
        let onnx_path_str = onnx_path.display().to_string();
        Session::builder()
            .map_err(|e: ort::Error| errors::ort_error(&e.to_string()))?
            .commit_from_file(onnx_path)
            .map_err(|e: ort::Error| errors::model_load(&onnx_path_str, &e.to_string()))
    }

    /// Create ONNX Runtime session with specified provider
    fn create_session(onnx_path: &Path, provider: ExecutionProvider) -> UnifiedResult<Session> {
        match provider {
            ExecutionProvider::Cpu => {
                tracing::info!("Using CPU execution provider");
                Self::cpu_session(onnx_path)
            }
            ExecutionProvider::Cuda | ExecutionProvider::Auto => {
                #[cfg(feature = "cuda")]
                {
                    use ort::execution_providers::CUDAExecutionProvider;
                    if let Ok(session) = Session::builder()
                        .map_err(|e: ort::Error| errors::ort_error(&e.to_string()))?
                        .with_execution_providers([CUDAExecutionProvider::default().build()])
                        .and_then(|b| b.commit_from_file(onnx_path))
                    {
                        tracing::info!("Using CUDA execution provider (NVIDIA GPU)");
                        return Ok(session);
                    }
                }

                if provider == ExecutionProvider::Cuda {
                    tracing::warn!("CUDA not available, falling back to CPU");
                } else {
                    tracing::info!("Using CPU execution provider");
                }
                Self::cpu_session(onnx_path)
            }
        }
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Declared graph inputs
    pub fn inputs(&self) -> &[TensorSlot] {
        &self.inputs
    }

    /// Declared graph outputs
    pub fn outputs(&self) -> &[TensorSlot] {
        &self.outputs
    }

    /// Feeding plan matching this graph's declared inputs
    pub fn feed_plan(&self, assembler: &FeatureAssembler) -> UnifiedResult<FeedPlan> {
        FeedPlan::resolve(&self.inputs, assembler)
    }

    /// Run the graph on validated inputs
    ///
    /// Returns one entry per declared output, in graph order.
    pub fn run(&mut self, feeds: &[InputTensor]) -> UnifiedResult<Vec<NamedOutput>> {
        check_feeds(&self.inputs, feeds)?;

        let mut inputs: Vec<(String, SessionInputValue<'static>)> = Vec::with_capacity(feeds.len());
        for feed in feeds {
            let tensor = Tensor::from_array((feed.shape.clone(), feed.data.clone()))
                .map_err(|e: ort::Error| errors::inference_error("create_input", &e.to_string()))?;
            inputs.push((feed.name.clone(), tensor.into()));
        }

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e: ort::Error| errors::inference_error("session_run", &e.to_string()))?;

        Ok(self
            .outputs
            .iter()
            .map(|slot| NamedOutput {
                name: slot.name.clone(),
                value: outputs.get(slot.name.as_str()).and_then(extract_output),
            })
            .collect())
    }

    /// Feed one record through the graph
    pub fn predict(
        &mut self,
        plan: &FeedPlan,
        assembler: &FeatureAssembler,
        record: &WineRecord,
    ) -> UnifiedResult<OnnxPrediction> {
        let feeds = plan.feeds(record, assembler);
        let outputs = self.run(&feeds)?;
        OnnxPrediction::from_outputs(outputs)
    }
}
