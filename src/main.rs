//! Wine clustering CLI
//!
//! Runs the full train, export and inference workflow. With no flags it
//! reads `wine-clustering.csv` from the working directory and writes
//! `wineClusteringModel.zip` and `wineClusteringModel.onnx` next to it.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use onnx_wine_clustering::ExecutionProvider;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use wine_clustering::{run_pipeline, PipelineConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Auto,
    Cpu,
    Cuda,
}

impl From<ProviderArg> for ExecutionProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Auto => ExecutionProvider::Auto,
            ProviderArg::Cpu => ExecutionProvider::Cpu,
            ProviderArg::Cuda => ExecutionProvider::Cuda,
        }
    }
}

/// Cluster wine samples and round-trip the model through ONNX
#[derive(Parser, Debug)]
#[command(name = "wine-clustering")]
#[command(version)]
#[command(about = "Fit a k-means model on wine chemistry data, export it to ONNX and run it")]
struct Cli {
    /// TOML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training CSV
    #[arg(long)]
    data: Option<PathBuf>,

    /// Native model archive to write
    #[arg(long)]
    model: Option<PathBuf>,

    /// ONNX file to write
    #[arg(long)]
    onnx: Option<PathBuf>,

    /// Number of clusters
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// CSV of records to run through the exported graph
    #[arg(long)]
    samples: Option<PathBuf>,

    /// ONNX Runtime execution provider
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Skip comparing ONNX predictions with the native archive
    #[arg(long)]
    no_verify: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(onnx) = self.onnx {
            config.onnx_path = onnx;
        }
        if let Some(k) = self.clusters {
            config.trainer.num_clusters = k;
        }
        if let Some(samples) = self.samples {
            config.samples_path = Some(samples);
        }
        if let Some(provider) = self.provider {
            config.execution_provider = provider.into();
        }
        if self.no_verify {
            config.verify_round_trip = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "resolved configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run_pipeline(&config, &mut out) {
        tracing::error!(stage = %e.stage, "workflow failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
