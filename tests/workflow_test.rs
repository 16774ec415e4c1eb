//! Full workflow against the fixture dataset

use ml_wine_clustering::{load_archive, write_records, WineRecord};
use onnx_wine_clustering::{
    read_model, ExecutionProvider, OnnxPrediction, PREDICTED_LABEL_OUTPUT, SCORE_OUTPUT,
};
use std::path::Path;
use tempfile::TempDir;
use wine_clustering::{
    builtin_samples, open_session, run_pipeline, verify_prediction, PipelineConfig, Stage,
};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/wine-clustering.csv");

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_path: FIXTURE.into(),
        model_path: dir.join("wineClusteringModel.zip"),
        onnx_path: dir.join("wineClusteringModel.onnx"),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_full_workflow_writes_artifacts_and_report() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());

    let mut out = Vec::new();
    let report = run_pipeline(&config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        format!("Model saved to: {}", config.model_path.display())
    );
    assert_eq!(
        lines[1],
        format!("Model saved to ONNX format at {}", config.onnx_path.display())
    );

    // one line per output for each built-in sample
    assert_eq!(lines.len(), 2 + 2 * 2);
    assert!(lines[2].starts_with(&format!("{}: ", PREDICTED_LABEL_OUTPUT)));
    assert!(lines[3].starts_with(&format!("{}: ", SCORE_OUTPUT)));

    assert_eq!(report.training_rows, 60);
    assert_eq!(report.samples.len(), 2);
    for outcome in &report.samples {
        assert!(outcome.onnx.cluster_id < 3);
        assert_eq!(outcome.onnx.scores.len(), 3);
        let native = outcome.native.as_ref().unwrap();
        assert_eq!(native.cluster_id, outcome.onnx.cluster_id);
    }

    assert!(config.model_path.is_file());
    assert_eq!(load_archive(&config.model_path).unwrap().num_clusters(), 3);

    let model = read_model(&config.onnx_path).unwrap();
    assert_eq!(model.graph.unwrap().input.len(), 13);
    assert_eq!(report.signature.inputs.len(), 13);
}

#[test]
fn test_samples_file_and_no_verify() {
    let dir = TempDir::new().unwrap();
    let samples_path = dir.path().join("samples.csv");
    let mut samples: Vec<WineRecord> = builtin_samples();
    samples.push(samples[0]);
    write_records(std::fs::File::create(&samples_path).unwrap(), &samples).unwrap();

    let config = PipelineConfig {
        samples_path: Some(samples_path),
        verify_round_trip: false,
        ..config_in(dir.path())
    };

    let mut out = Vec::new();
    let report = run_pipeline(&config, &mut out).unwrap();

    assert_eq!(report.samples.len(), 3);
    assert!(report.samples.iter().all(|s| s.native.is_none()));
    assert_eq!(
        report.samples[0].onnx.cluster_id,
        report.samples[2].onnx.cluster_id
    );
}

#[test]
fn test_failures_name_their_stage() {
    let dir = TempDir::new().unwrap();

    let missing_data = PipelineConfig {
        data_path: dir.path().join("absent.csv"),
        ..config_in(dir.path())
    };
    let err = run_pipeline(&missing_data, &mut Vec::new()).unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(err.to_string().starts_with("load stage failed"));

    let mut too_many_clusters = config_in(dir.path());
    too_many_clusters.trainer.num_clusters = 500;
    let err = run_pipeline(&too_many_clusters, &mut Vec::new()).unwrap_err();
    assert_eq!(err.stage, Stage::Fit);

    let unwritable = PipelineConfig {
        model_path: dir.path().join("missing-dir").join("model.zip"),
        ..config_in(dir.path())
    };
    let err = run_pipeline(&unwritable, &mut Vec::new()).unwrap_err();
    assert_eq!(err.stage, Stage::Save);

    let unexportable = PipelineConfig {
        onnx_path: dir.path().join("missing-dir").join("model.onnx"),
        ..config_in(dir.path())
    };
    let err = run_pipeline(&unexportable, &mut Vec::new()).unwrap_err();
    assert_eq!(err.stage, Stage::Export);
}

#[test]
fn test_unreadable_graph_fails_session_stage() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    run_pipeline(&config, &mut Vec::new()).unwrap();
    let pipeline = load_archive(&config.model_path).unwrap();

    std::fs::write(&config.onnx_path, b"truncated graph").unwrap();
    let Err(err) = open_session(&config.onnx_path, ExecutionProvider::Cpu, &pipeline.assembler)
    else {
        panic!("corrupt graph opened");
    };
    assert_eq!(err.stage, Stage::Session);
    assert!(err.to_string().starts_with("session stage failed"));

    let Err(err) = open_session(dir.path(), ExecutionProvider::Cpu, &pipeline.assembler) else {
        panic!("directory opened as a graph");
    };
    assert_eq!(err.stage, Stage::Session);
}

#[test]
fn test_disagreeing_prediction_fails_verify_stage() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let report = run_pipeline(&config, &mut Vec::new()).unwrap();
    let pipeline = load_archive(&config.model_path).unwrap();

    let outcome = &report.samples[0];
    let agreeing = verify_prediction(1, &pipeline, &outcome.record, &outcome.onnx).unwrap();
    assert_eq!(agreeing.cluster_id, outcome.onnx.cluster_id);

    let disagreeing = OnnxPrediction {
        cluster_id: (outcome.onnx.cluster_id + 1) % 3,
        ..outcome.onnx.clone()
    };
    let err = verify_prediction(1, &pipeline, &outcome.record, &disagreeing).unwrap_err();
    assert_eq!(err.stage, Stage::Verify);
    assert!(err.to_string().contains("sample 1"));
}
