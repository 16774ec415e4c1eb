//! Training pipeline: feature assembly followed by k-means
//!
//! A [`FittedPipeline`] carries the schema of the data it was trained on so
//! the same column names can be reused as interchange graph inputs.

use crate::dataset::{WineRecord, WINE_COLUMNS};
use crate::error::{MlError, MlResult};
use crate::features::FeatureAssembler;
use crate::kmeans::{ClusterAssignment, KMeansModel, KMeansTrainer};
use serde::{Deserialize, Serialize};

/// One column of the training input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub index: usize,
    /// Element type name, always "Single" for wine measurements
    pub kind: String,
}

/// Ordered description of the training input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
}

impl DatasetSchema {
    /// Schema of [`WineRecord`] as read from the CSV file
    pub fn wine() -> Self {
        Self {
            columns: WINE_COLUMNS
                .iter()
                .enumerate()
                .map(|(index, name)| ColumnSchema {
                    name: name.to_string(),
                    index,
                    kind: "Single".to_string(),
                })
                .collect(),
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// Unfitted pipeline: assembler plus trainer settings
#[derive(Debug, Clone)]
pub struct ClusteringPipeline {
    assembler: FeatureAssembler,
    trainer: KMeansTrainer,
}

impl ClusteringPipeline {
    pub fn new(assembler: FeatureAssembler, trainer: KMeansTrainer) -> Self {
        Self { assembler, trainer }
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn trainer(&self) -> &KMeansTrainer {
        &self.trainer
    }

    pub fn fit(&self, records: &[WineRecord]) -> MlResult<FittedPipeline> {
        if records.is_empty() {
            return Err(MlError::Training("no training records".to_string()));
        }

        let features = self.assembler.assemble_batch(records);
        let model = self.trainer.fit(&features)?;

        Ok(FittedPipeline {
            schema: DatasetSchema::wine(),
            assembler: self.assembler.clone(),
            model,
        })
    }
}

/// Pipeline after fitting
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub schema: DatasetSchema,
    pub assembler: FeatureAssembler,
    pub model: KMeansModel,
}

impl FittedPipeline {
    pub fn num_clusters(&self) -> usize {
        self.model.num_clusters()
    }

    /// Native inference for one record
    pub fn predict(&self, record: &WineRecord) -> MlResult<ClusterAssignment> {
        let features: Vec<f64> = self
            .assembler
            .assemble(record)
            .into_iter()
            .map(f64::from)
            .collect();
        self.model.predict(&features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_records() -> Vec<WineRecord> {
        let mut records = Vec::new();
        for (i, proline) in [400.0f32, 410.0, 405.0, 800.0, 790.0, 810.0, 1200.0, 1190.0, 1210.0]
            .into_iter()
            .enumerate()
        {
            let mut values = [2.0f32; 13];
            values[0] = 12.0 + (i % 3) as f32 * 0.1;
            values[12] = proline;
            records.push(WineRecord::from_values(values));
        }
        records
    }

    #[test]
    fn test_wine_schema_matches_columns() {
        let schema = DatasetSchema::wine();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, WINE_COLUMNS.to_vec());
        assert_eq!(schema.columns[4].index, 4);
        assert!(schema.contains("OD280"));
        assert!(!schema.contains("Features"));
    }

    #[test]
    fn test_fit_and_predict() {
        let pipeline = ClusteringPipeline::new(FeatureAssembler::all_columns(), KMeansTrainer::default());
        let fitted = pipeline.fit(&blob_records()).unwrap();

        assert_eq!(fitted.num_clusters(), 3);
        for record in blob_records() {
            let assignment = fitted.predict(&record).unwrap();
            assert!(assignment.cluster_id < 3);
            assert_eq!(assignment.scores.len(), 3);
        }

        let low = fitted.predict(&blob_records()[0]).unwrap().cluster_id;
        let high = fitted.predict(&blob_records()[8]).unwrap().cluster_id;
        assert_ne!(low, high);
    }

    #[test]
    fn test_fit_without_records_fails() {
        let pipeline = ClusteringPipeline::new(FeatureAssembler::all_columns(), KMeansTrainer::default());
        assert!(matches!(pipeline.fit(&[]), Err(MlError::Training(_))));
    }
}
