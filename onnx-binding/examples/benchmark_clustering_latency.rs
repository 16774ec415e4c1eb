//! Benchmark exported clustering graph latency on CPU vs GPU
//!
//! Expects `wineClusteringModel.onnx` and `wine-clustering.csv` in the
//! working directory (run the `wine-clustering` binary first), or paths as
//! the first and second arguments.
//!
//! Usage:
//!   cargo run --release --example benchmark_clustering_latency
//!   cargo run --release --features cuda --example benchmark_clustering_latency

use ml_wine_clustering::{load_records, FeatureAssembler, WineRecord};
use onnx_wine_clustering::{ClusteringSession, ExecutionProvider, FeedPlan, InputTensor};
use std::time::Instant;

const WARMUP_RUNS: usize = 5;
const BENCH_RUNS: usize = 50;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| "wineClusteringModel.onnx".to_string());
    let data_path = args.next().unwrap_or_else(|| "wine-clustering.csv".to_string());

    println!("============================================================");
    println!("Wine Clustering ONNX Runtime Latency Benchmark");
    println!("============================================================\n");

    if !std::path::Path::new(&model_path).exists() {
        println!("Skipping - {} not found", model_path);
        return Ok(());
    }

    let records = load_records(&data_path)?;
    let assembler = FeatureAssembler::all_columns();
    println!("Loaded {} records from {}\n", records.len(), data_path);

    for (provider, label) in [
        (ExecutionProvider::Cpu, "CPU"),
        (ExecutionProvider::Auto, "GPU (Auto)"),
    ] {
        println!("--- {} ---", label);
        let mut session = match ClusteringSession::load(&model_path, provider) {
            Ok(session) => session,
            Err(e) => {
                println!("Failed to load model: {}", e);
                continue;
            }
        };
        let plan = session.feed_plan(&assembler)?;

        benchmark_single(&mut session, &plan, &assembler, &records[0]);
        if let FeedPlan::PerColumn(columns) = &plan {
            benchmark_batch(&mut session, columns, &records);
        }
        println!();
    }

    println!("✅ Benchmark complete!");

    Ok(())
}

fn benchmark_single(
    session: &mut ClusteringSession,
    plan: &FeedPlan,
    assembler: &FeatureAssembler,
    record: &WineRecord,
) {
    // Warmup
    for _ in 0..WARMUP_RUNS {
        let _ = session.predict(plan, assembler, record);
    }

    // Benchmark
    let mut times = Vec::with_capacity(BENCH_RUNS);
    for _ in 0..BENCH_RUNS {
        let start = Instant::now();
        let _ = session.predict(plan, assembler, record);
        times.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let avg = times.iter().sum::<f64>() / times.len() as f64;
    let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    println!("  Single record: avg={:.3}ms, min={:.3}ms, max={:.3}ms", avg, min, max);
}

fn benchmark_batch(session: &mut ClusteringSession, columns: &[(String, usize)], records: &[WineRecord]) {
    let feeds: Vec<InputTensor> = columns
        .iter()
        .map(|(name, index)| {
            let values = records.iter().map(|r| r.values()[*index]).collect();
            InputTensor::new(name, vec![records.len(), 1], values)
        })
        .collect();

    // Warmup
    for _ in 0..WARMUP_RUNS {
        let _ = session.run(&feeds);
    }

    // Benchmark
    let mut times = Vec::with_capacity(BENCH_RUNS);
    for _ in 0..BENCH_RUNS {
        let start = Instant::now();
        let _ = session.run(&feeds);
        times.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let avg = times.iter().sum::<f64>() / times.len() as f64;
    let per_record = avg / records.len() as f64;

    println!("  Batch ({}): total={:.3}ms, per-record={:.4}ms", records.len(), avg, per_record);
}
