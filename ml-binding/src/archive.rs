//! Native model archive
//!
//! A zip file with two entries:
//! - `model.json`: the k-means model data
//! - `schema.json`: training input schema and feature assembly settings

use crate::error::{MlError, MlResult};
use crate::features::FeatureAssembler;
use crate::kmeans::KMeansModel;
use crate::pipeline::{DatasetSchema, FittedPipeline};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MODEL_ENTRY: &str = "model.json";
const SCHEMA_ENTRY: &str = "schema.json";
const ARCHIVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SchemaData {
    format_version: u32,
    input: DatasetSchema,
    feature_column: String,
    feature_columns: Vec<String>,
}

fn zip_error(path: &str, e: ZipError) -> MlError {
    match e {
        ZipError::Io(io) => MlError::io(path, io),
        other => MlError::Serialization(other.to_string()),
    }
}

/// Write the fitted pipeline to a zip archive
///
/// The file is finished and closed before this returns.
pub fn save_archive<P: AsRef<Path>>(pipeline: &FittedPipeline, path: P) -> MlResult<()> {
    let path_str = path.as_ref().display().to_string();

    let model_json = pipeline.model.to_json()?;
    let schema_json = serde_json::to_string_pretty(&SchemaData {
        format_version: ARCHIVE_FORMAT_VERSION,
        input: pipeline.schema.clone(),
        feature_column: pipeline.assembler.output_column().to_string(),
        feature_columns: pipeline.assembler.columns().to_vec(),
    })
    .map_err(|e| MlError::Serialization(e.to_string()))?;

    let file = File::create(path.as_ref()).map_err(|e| MlError::io(&path_str, e))?;
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MODEL_ENTRY, options)
        .map_err(|e| zip_error(&path_str, e))?;
    zip.write_all(model_json.as_bytes())
        .map_err(|e| MlError::io(&path_str, e))?;

    zip.start_file(SCHEMA_ENTRY, options)
        .map_err(|e| zip_error(&path_str, e))?;
    zip.write_all(schema_json.as_bytes())
        .map_err(|e| MlError::io(&path_str, e))?;

    let mut file = zip.finish().map_err(|e| zip_error(&path_str, e))?;
    file.flush().map_err(|e| MlError::io(&path_str, e))?;

    tracing::debug!(path = %path_str, "wrote native model archive");
    Ok(())
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str, path: &str) -> MlResult<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| MlError::load(path, format!("{}: {}", name, e)))?;
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| MlError::load(path, format!("{}: {}", name, e)))?;
    Ok(contents)
}

/// Read a fitted pipeline back from a zip archive
pub fn load_archive<P: AsRef<Path>>(path: P) -> MlResult<FittedPipeline> {
    let path_str = path.as_ref().display().to_string();

    let file = File::open(path.as_ref()).map_err(|e| MlError::load(&path_str, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| MlError::load(&path_str, e))?;

    let schema: SchemaData = serde_json::from_str(&read_entry(&mut archive, SCHEMA_ENTRY, &path_str)?)
        .map_err(|e| MlError::load(&path_str, e))?;
    if schema.format_version != ARCHIVE_FORMAT_VERSION {
        return Err(MlError::load(
            &path_str,
            format!("unsupported archive version {}", schema.format_version),
        ));
    }

    let model = KMeansModel::from_json(&read_entry(&mut archive, MODEL_ENTRY, &path_str)?)
        .map_err(|e| MlError::load(&path_str, e))?;
    let assembler = FeatureAssembler::new(&schema.feature_column, schema.feature_columns.as_slice())
        .map_err(|e| MlError::load(&path_str, e))?;

    Ok(FittedPipeline {
        schema: schema.input,
        assembler,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn fitted() -> FittedPipeline {
        FittedPipeline {
            schema: DatasetSchema::wine(),
            assembler: FeatureAssembler::new("Features", &["Alcohol", "Proline"]).unwrap(),
            model: KMeansModel::from_centroids(array![[12.0, 500.0], [13.0, 800.0], [14.0, 1100.0]]),
        }
    }

    #[test]
    fn test_save_and_load_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.zip");

        save_archive(&fitted(), &path).unwrap();
        let restored = load_archive(&path).unwrap();

        assert_eq!(restored.schema, DatasetSchema::wine());
        assert_eq!(restored.assembler, fitted().assembler);
        assert_eq!(restored.model.centroids(), fitted().model.centroids());
        assert!(restored.model.is_trained());
    }

    #[test]
    fn test_save_into_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("model.zip");

        assert!(matches!(
            save_archive(&fitted(), &path),
            Err(MlError::Io { .. })
        ));
    }

    #[test]
    fn test_load_rejects_non_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.zip");
        std::fs::write(&path, b"not a zip file").unwrap();

        assert!(matches!(load_archive(&path), Err(MlError::Load { .. })));
        assert!(matches!(
            load_archive(dir.path().join("missing.zip")),
            Err(MlError::Load { .. })
        ));
    }
}
