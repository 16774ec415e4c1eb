//! ONNX export of fitted clustering pipelines
//!
//! The exported graph takes one `[N, 1]` float tensor per feature column,
//! named after the training schema column, and produces `PredictedLabel`
//! and `Score`.

pub mod kmeans_graph;
pub mod onnx_proto;

use crate::core::unified_error::{errors, UnifiedResult};
use kmeans_graph::build_graph;
use ml_wine_clustering::{FittedPipeline, WineRecord};
use onnx_proto::{ModelProto, OperatorSetIdProto, StringStringEntryProto, ValueInfoProto};
use prost::Message;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub use kmeans_graph::{PREDICTED_LABEL_OUTPUT, SCORE_OUTPUT};

/// IR version 7 pairs with opset 13
const IR_VERSION: i64 = 7;
const OPSET_VERSION: i64 = 13;

/// Declared name, element type and dims of one graph input or output
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSignature {
    pub name: String,
    /// ONNX `TensorProto.DataType` code
    pub elem_type: i32,
    /// `None` marks a symbolic dimension
    pub dims: Vec<Option<i64>>,
}

/// Inputs and outputs as declared by an exported graph
#[derive(Debug, Clone, PartialEq)]
pub struct InterchangeSignature {
    pub inputs: Vec<TensorSignature>,
    pub outputs: Vec<TensorSignature>,
}

impl InterchangeSignature {
    pub fn from_model(model: &ModelProto) -> Self {
        fn collect(values: &[ValueInfoProto]) -> Vec<TensorSignature> {
            values
                .iter()
                .filter_map(|v| {
                    v.tensor_signature().map(|(elem_type, dims)| TensorSignature {
                        name: v.name.clone(),
                        elem_type,
                        dims,
                    })
                })
                .collect()
        }

        let graph = model.graph.as_ref();
        Self {
            inputs: graph.map(|g| collect(&g.input)).unwrap_or_default(),
            outputs: graph.map(|g| collect(&g.output)).unwrap_or_default(),
        }
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|i| i.name.as_str()).collect()
    }
}

/// Check that every stage of the pipeline has a graph equivalent
///
/// `sample` is a representative batch; every record must assemble into a
/// vector of the width the model was fitted on.
fn validate(pipeline: &FittedPipeline, sample: &[WineRecord]) -> UnifiedResult<()> {
    if !pipeline.model.is_trained() {
        return Err(errors::conversion_error("KMeans", "model is not trained"));
    }

    for column in pipeline.assembler.columns() {
        if !pipeline.schema.contains(column) {
            return Err(errors::conversion_error(
                "Concatenate",
                &format!("column '{}' is not part of the training schema", column),
            ));
        }
    }

    let dim = pipeline.model.dimension().unwrap_or(0);
    if dim != pipeline.assembler.dimension() {
        return Err(errors::conversion_error(
            "KMeans",
            &format!(
                "model expects {} features but the assembler produces {}",
                dim,
                pipeline.assembler.dimension()
            ),
        ));
    }

    if sample.is_empty() {
        return Err(errors::conversion_error(
            "Concatenate",
            "a representative input batch is required to fix input shapes",
        ));
    }

    for (row, record) in sample.iter().enumerate() {
        let features = pipeline.assembler.assemble(record);
        if features.len() != dim || features.iter().any(|v| !v.is_finite()) {
            return Err(errors::conversion_error(
                "Concatenate",
                &format!("representative row {} does not assemble into {} finite features", row, dim),
            ));
        }
    }

    Ok(())
}

/// Convert a fitted pipeline into an ONNX model
pub fn build_model(pipeline: &FittedPipeline, sample: &[WineRecord]) -> UnifiedResult<ModelProto> {
    validate(pipeline, sample)?;
    let graph = build_graph(pipeline)?;

    Ok(ModelProto {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        model_version: 1,
        doc_string: format!(
            "k-means with {} clusters over {} features",
            pipeline.num_clusters(),
            pipeline.assembler.dimension()
        ),
        graph: Some(graph),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
        }],
        metadata_props: vec![
            StringStringEntryProto {
                key: "feature_column".to_string(),
                value: pipeline.assembler.output_column().to_string(),
            },
            StringStringEntryProto {
                key: "num_clusters".to_string(),
                value: pipeline.num_clusters().to_string(),
            },
        ],
        ..Default::default()
    })
}

/// Export a fitted pipeline to an ONNX file
///
/// The file is flushed and closed before this returns.
pub fn export_onnx<P: AsRef<Path>>(
    pipeline: &FittedPipeline,
    sample: &[WineRecord],
    path: P,
) -> UnifiedResult<InterchangeSignature> {
    let path_str = path.as_ref().display().to_string();

    let model = build_model(pipeline, sample)?;
    let bytes = model.encode_to_vec();

    {
        let mut file = File::create(path.as_ref())
            .map_err(|e| errors::io_error(&path_str, &e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| errors::io_error(&path_str, &e.to_string()))?;
        file.flush()
            .map_err(|e| errors::io_error(&path_str, &e.to_string()))?;
    }

    let signature = InterchangeSignature::from_model(&model);
    tracing::info!(
        path = %path_str,
        bytes = bytes.len(),
        inputs = ?signature.input_names(),
        "exported ONNX model"
    );

    Ok(signature)
}

/// Decode an ONNX file without creating a runtime session
pub fn read_model<P: AsRef<Path>>(path: P) -> UnifiedResult<ModelProto> {
    let path_str = path.as_ref().display().to_string();

    if !path.as_ref().exists() {
        return Err(errors::file_not_found(&path_str));
    }

    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| errors::model_load(&path_str, &e.to_string()))?;
    ModelProto::decode(bytes.as_slice()).map_err(|e| errors::model_load(&path_str, &e.to_string()))
}
