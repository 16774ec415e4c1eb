//! Feature assembly: concatenate named record columns into one vector

use crate::dataset::{WineRecord, WINE_COLUMNS};
use crate::error::{MlError, MlResult};
use ndarray::Array2;
use std::collections::HashSet;

/// Name of the assembled feature column
pub const DEFAULT_FEATURE_COLUMN: &str = "Features";

/// Concatenates a fixed, ordered list of record columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAssembler {
    output_column: String,
    columns: Vec<String>,
    indices: Vec<usize>,
}

impl FeatureAssembler {
    /// Resolve column names against [`WineRecord`]
    ///
    /// Fails if the list is empty, names a column the record does not have,
    /// or repeats a column.
    pub fn new<S: AsRef<str>>(output_column: &str, columns: &[S]) -> MlResult<Self> {
        if columns.is_empty() {
            return Err(MlError::config("columns", "at least one feature column is required"));
        }

        let mut seen = HashSet::new();
        let mut indices = Vec::with_capacity(columns.len());

        for column in columns {
            let name = column.as_ref();
            let index = WineRecord::column_index(name).ok_or_else(|| {
                MlError::config(name, "column does not exist on the wine record")
            })?;
            if !seen.insert(index) {
                return Err(MlError::config(name, "column listed more than once"));
            }
            indices.push(index);
        }

        Ok(Self {
            output_column: output_column.to_string(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            indices,
        })
    }

    /// Assembler over all 13 columns in file order
    pub fn all_columns() -> Self {
        Self {
            output_column: DEFAULT_FEATURE_COLUMN.to_string(),
            columns: WINE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            indices: (0..WINE_COLUMNS.len()).collect(),
        }
    }

    pub fn output_column(&self) -> &str {
        &self.output_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dimension(&self) -> usize {
        self.indices.len()
    }

    pub fn assemble(&self, record: &WineRecord) -> Vec<f32> {
        let values = record.values();
        self.indices.iter().map(|&i| values[i]).collect()
    }

    /// Assemble a batch into an `N x D` matrix for training
    pub fn assemble_batch(&self, records: &[WineRecord]) -> Array2<f64> {
        let dim = self.dimension();
        let mut batch = Array2::<f64>::zeros((records.len(), dim));

        for (mut row, record) in batch.rows_mut().into_iter().zip(records) {
            for (slot, value) in row.iter_mut().zip(self.assemble(record)) {
                *slot = value as f64;
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WineRecord {
        WineRecord::from_values([
            13.4, 2.3, 2.5, 19.8, 99.5, 2.5, 2.3, 0.2, 1.3, 3.1, 0.6, 2.1, 1050.0,
        ])
    }

    #[test]
    fn test_all_columns_matches_record_order() {
        let assembler = FeatureAssembler::all_columns();
        assert_eq!(assembler.dimension(), 13);
        assert_eq!(assembler.output_column(), "Features");
        assert_eq!(assembler.assemble(&sample()), sample().values().to_vec());
    }

    #[test]
    fn test_configured_order_is_preserved() {
        let assembler = FeatureAssembler::new("Features", &["Proline", "Alcohol", "Hue"]).unwrap();
        assert_eq!(assembler.assemble(&sample()), vec![1050.0, 13.4, 0.6]);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let assembler = FeatureAssembler::all_columns();
        let record = sample();
        assert_eq!(assembler.assemble(&record), assembler.assemble(&record));
    }

    #[test]
    fn test_unknown_column_is_config_error() {
        let err = FeatureAssembler::new("Features", &["Alcohol", "Residual_Sugar"]).unwrap_err();
        match err {
            MlError::Config { field, .. } => assert_eq!(field, "Residual_Sugar"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_and_empty_columns_rejected() {
        assert!(FeatureAssembler::new("Features", &["Ash", "Ash"]).is_err());
        assert!(FeatureAssembler::new::<&str>("Features", &[]).is_err());
    }

    #[test]
    fn test_assemble_batch_shape() {
        let assembler = FeatureAssembler::new("Features", &["Alcohol", "Proline"]).unwrap();
        let batch = assembler.assemble_batch(&[sample(), sample()]);
        assert_eq!(batch.shape(), &[2, 2]);
        assert!((batch[[1, 1]] - 1050.0).abs() < 1e-9);
        assert!((batch[[0, 0]] - 13.4).abs() < 1e-5);
    }
}
