//! End-to-end workflow: load, fit, persist, export, run and verify
//!
//! Console results go to the supplied writer; diagnostics go through
//! `tracing`.

use crate::config::PipelineConfig;
use crate::samples::builtin_samples;
use ml_wine_clustering::{
    load_archive, load_records, save_archive, ClusterAssignment, ClusteringPipeline,
    FeatureAssembler, FittedPipeline, WineRecord,
};
use onnx_wine_clustering::{
    export_onnx, report_outputs, ClusteringSession, ExecutionProvider, FeedPlan,
    InterchangeSignature, OnnxPrediction,
};
use std::fmt;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Workflow step a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Fit,
    Save,
    Export,
    Session,
    Infer,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Fit => "fit",
            Stage::Save => "save",
            Stage::Export => "export",
            Stage::Session => "session",
            Stage::Infer => "infer",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Native and interchange predictions disagree
#[derive(Debug, Error)]
#[error("sample {sample}: native model predicted cluster {native}, ONNX graph predicted {onnx}")]
pub struct PredictionMismatch {
    pub sample: usize,
    pub native: u32,
    pub onnx: u32,
}

trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError::new(stage, e))
    }
}

/// One sample as seen by both runtimes
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub record: WineRecord,
    pub onnx: OnnxPrediction,
    /// Present when round-trip verification is enabled
    pub native: Option<ClusterAssignment>,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub training_rows: usize,
    pub signature: InterchangeSignature,
    pub samples: Vec<SampleOutcome>,
}

/// Open the exported graph and resolve how records are fed to it
pub fn open_session<P: AsRef<Path>>(
    onnx_path: P,
    provider: ExecutionProvider,
    assembler: &FeatureAssembler,
) -> Result<(ClusteringSession, FeedPlan), StageError> {
    let session = ClusteringSession::load(onnx_path, provider).stage(Stage::Session)?;
    let plan = session.feed_plan(assembler).stage(Stage::Session)?;
    tracing::debug!(?plan, "resolved feed plan");
    Ok((session, plan))
}

/// Native prediction for `record`, which must agree with the graph's id;
/// `sample` is 1-based
pub fn verify_prediction(
    sample: usize,
    native: &FittedPipeline,
    record: &WineRecord,
    onnx: &OnnxPrediction,
) -> Result<ClusterAssignment, StageError> {
    let assignment = native.predict(record).stage(Stage::Verify)?;
    if assignment.cluster_id != onnx.cluster_id {
        return Err(StageError::new(
            Stage::Verify,
            PredictionMismatch {
                sample,
                native: assignment.cluster_id,
                onnx: onnx.cluster_id,
            },
        ));
    }
    Ok(assignment)
}

/// Run every stage in order, stopping at the first failure
pub fn run_pipeline<W: Write>(
    config: &PipelineConfig,
    out: &mut W,
) -> Result<PipelineReport, StageError> {
    let records = load_records(&config.data_path).stage(Stage::Load)?;
    tracing::info!(
        path = %config.data_path.display(),
        rows = records.len(),
        "loaded training data"
    );

    let assembler = FeatureAssembler::new(&config.feature_column, config.feature_columns.as_slice())
        .stage(Stage::Fit)?;
    let pipeline = ClusteringPipeline::new(assembler, config.trainer.clone());
    let fitted = pipeline.fit(&records).stage(Stage::Fit)?;

    save_archive(&fitted, &config.model_path).stage(Stage::Save)?;
    writeln!(out, "Model saved to: {}", config.model_path.display()).stage(Stage::Save)?;

    let signature = export_onnx(&fitted, &records, &config.onnx_path).stage(Stage::Export)?;
    writeln!(
        out,
        "Model saved to ONNX format at {}",
        config.onnx_path.display()
    )
    .stage(Stage::Export)?;

    let samples = match &config.samples_path {
        Some(path) => load_records(path).stage(Stage::Load)?,
        None => builtin_samples(),
    };

    // Verification runs against the persisted archive, not the in-memory fit
    let native = if config.verify_round_trip {
        Some(load_archive(&config.model_path).stage(Stage::Verify)?)
    } else {
        None
    };

    let (mut session, plan) =
        open_session(&config.onnx_path, config.execution_provider, &fitted.assembler)?;

    let mut outcomes = Vec::with_capacity(samples.len());
    for (i, record) in samples.iter().enumerate() {
        let onnx = session
            .predict(&plan, &fitted.assembler, record)
            .stage(Stage::Infer)?;
        report_outputs(&onnx.outputs, out).stage(Stage::Infer)?;

        let assignment = match &native {
            Some(reloaded) => Some(verify_prediction(i + 1, reloaded, record, &onnx)?),
            None => None,
        };

        outcomes.push(SampleOutcome {
            record: *record,
            onnx,
            native: assignment,
        });
    }

    tracing::info!(
        samples = outcomes.len(),
        verified = native.is_some(),
        "inference complete"
    );
    drop(session);

    Ok(PipelineReport {
        training_rows: records.len(),
        signature,
        samples: outcomes,
    })
}
