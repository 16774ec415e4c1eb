//! Pipeline configuration
//!
//! Defaults are the fixed file names used when no flags are given. A TOML file
//! can override any subset of fields; command line flags are applied last.

use anyhow::{bail, Context, Result};
use ml_wine_clustering::{KMeansTrainer, DEFAULT_FEATURE_COLUMN, WINE_COLUMNS};
use onnx_wine_clustering::ExecutionProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Training CSV
    pub data_path: PathBuf,
    /// Native zip archive output
    pub model_path: PathBuf,
    /// ONNX output
    pub onnx_path: PathBuf,
    /// Optional CSV of records to run through the session instead of the
    /// built-in samples
    pub samples_path: Option<PathBuf>,
    pub feature_column: String,
    pub feature_columns: Vec<String>,
    pub trainer: KMeansTrainer,
    pub execution_provider: ExecutionProvider,
    /// Compare ONNX predictions against the reloaded native archive
    pub verify_round_trip: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("wine-clustering.csv"),
            model_path: PathBuf::from("wineClusteringModel.zip"),
            onnx_path: PathBuf::from("wineClusteringModel.onnx"),
            samples_path: None,
            feature_column: DEFAULT_FEATURE_COLUMN.to_string(),
            feature_columns: WINE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            trainer: KMeansTrainer::default(),
            execution_provider: ExecutionProvider::default(),
            verify_round_trip: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse pipeline config")?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&contents)
    }

    /// Catch settings that would only fail deep inside a stage
    pub fn validate(&self) -> Result<()> {
        if self.trainer.num_clusters == 0 {
            bail!("trainer.num_clusters must be at least 1");
        }
        if self.trainer.max_iterations == 0 {
            bail!("trainer.max_iterations must be at least 1");
        }
        if !(self.trainer.tolerance > 0.0) {
            bail!("trainer.tolerance must be positive");
        }
        if self.feature_columns.is_empty() {
            bail!("feature_columns must not be empty");
        }
        if self.feature_column.is_empty() {
            bail!("feature_column must not be empty");
        }
        if self.model_path == self.onnx_path {
            bail!(
                "model_path and onnx_path both point to {}",
                self.model_path.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_path, PathBuf::from("wine-clustering.csv"));
        assert_eq!(config.model_path, PathBuf::from("wineClusteringModel.zip"));
        assert_eq!(config.onnx_path, PathBuf::from("wineClusteringModel.onnx"));
        assert_eq!(config.trainer.num_clusters, 3);
        assert_eq!(config.feature_columns.len(), 13);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            data_path = "data/wine.csv"
            execution_provider = "cpu"

            [trainer]
            num_clusters = 4
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("data/wine.csv"));
        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.trainer.num_clusters, 4);
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.trainer.max_iterations, 300);
        assert_eq!(config.onnx_path, PathBuf::from("wineClusteringModel.onnx"));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = PipelineConfig::default();
        config.trainer.num_clusters = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.onnx_path = config.model_path.clone();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.trainer.tolerance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        assert!(PipelineConfig::from_toml_str("verify_round_trip = \"yes\"").is_err());
    }
}
