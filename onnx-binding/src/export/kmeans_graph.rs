//! ONNX graph for a fitted k-means pipeline
//!
//! ```text
//! <column inputs [N,1]> -> Concat -> Features [N,D]
//!   -> Unsqueeze -> [N,1,D] -> Sub(Centroids [K,D]) -> [N,K,D]
//!   -> ReduceSumSquare -> Score [N,K]
//!   -> ArgMin -> [N,1] int64 -> Cast -> PredictedLabel [N,1] uint32
//! ```

use super::onnx_proto::{
    data_type, AttributeProto, GraphProto, NodeProto, TensorProto, ValueInfoProto,
};
use crate::core::unified_error::{errors, UnifiedResult};
use ml_wine_clustering::FittedPipeline;

pub const PREDICTED_LABEL_OUTPUT: &str = "PredictedLabel";
pub const SCORE_OUTPUT: &str = "Score";

const CENTROIDS: &str = "Centroids";
const UNSQUEEZE_AXES: &str = "UnsqueezeAxes";

/// Build the graph; the caller has already validated the pipeline
pub(crate) fn build_graph(pipeline: &FittedPipeline) -> UnifiedResult<GraphProto> {
    let centroids = pipeline
        .model
        .centroids()
        .filter(|_| pipeline.model.is_trained())
        .ok_or_else(|| errors::conversion_error("KMeans", "model is not trained"))?;

    let num_clusters = centroids.nrows() as i64;
    let dim = centroids.ncols() as i64;
    let features = pipeline.assembler.output_column();
    let columns: Vec<&str> = pipeline.assembler.columns().iter().map(String::as_str).collect();

    let expanded = format!("{}.expanded", features);
    let deltas = format!("{}.deltas", features);
    let label_index = format!("{}.index", PREDICTED_LABEL_OUTPUT);

    let node = vec![
        NodeProto::new("Concat", "Concatenate", &columns, &[features])
            .with_attribute(AttributeProto::int("axis", 1)),
        NodeProto::new("Unsqueeze", "ExpandFeatures", &[features, UNSQUEEZE_AXES], &[expanded.as_str()]),
        NodeProto::new("Sub", "CentroidDeltas", &[expanded.as_str(), CENTROIDS], &[deltas.as_str()]),
        NodeProto::new("ReduceSumSquare", "SquaredDistances", &[deltas.as_str()], &[SCORE_OUTPUT])
            .with_attribute(AttributeProto::ints("axes", &[2]))
            .with_attribute(AttributeProto::int("keepdims", 0)),
        NodeProto::new("ArgMin", "NearestCentroid", &[SCORE_OUTPUT], &[label_index.as_str()])
            .with_attribute(AttributeProto::int("axis", 1))
            .with_attribute(AttributeProto::int("keepdims", 1)),
        NodeProto::new("Cast", "LabelToKey", &[label_index.as_str()], &[PREDICTED_LABEL_OUTPUT])
            .with_attribute(AttributeProto::int("to", data_type::UINT32 as i64)),
    ];

    let initializer = vec![
        TensorProto {
            name: CENTROIDS.to_string(),
            dims: vec![num_clusters, dim],
            data_type: data_type::FLOAT,
            float_data: centroids.iter().map(|&v| v as f32).collect(),
            ..Default::default()
        },
        TensorProto {
            name: UNSQUEEZE_AXES.to_string(),
            dims: vec![1],
            data_type: data_type::INT64,
            int64_data: vec![1],
            ..Default::default()
        },
    ];

    let input = columns
        .iter()
        .map(|c| ValueInfoProto::tensor(c, data_type::FLOAT, &[None, Some(1)]))
        .collect();

    let output = vec![
        ValueInfoProto::tensor(PREDICTED_LABEL_OUTPUT, data_type::UINT32, &[None, Some(1)]),
        ValueInfoProto::tensor(SCORE_OUTPUT, data_type::FLOAT, &[None, Some(num_clusters)]),
    ];

    let value_info = vec![ValueInfoProto::tensor(features, data_type::FLOAT, &[None, Some(dim)])];

    Ok(GraphProto {
        node,
        name: "WineClustering".to_string(),
        initializer,
        input,
        output,
        value_info,
        ..Default::default()
    })
}
