//! Wine dataset loading
//!
//! Rows map positionally onto the 13 chemical measurements of [`WineRecord`],
//! left to right. The header row is required but only its width is checked,
//! so a file written with the wrong separator fails before any row is read.

use crate::error::{MlError, MlResult};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column names in file order
pub const WINE_COLUMNS: [&str; 13] = [
    "Alcohol",
    "Malic_Acid",
    "Ash",
    "Ash_Alcanity",
    "Magnesium",
    "Total_Phenols",
    "Flavanoids",
    "Nonflavanoid_Phenols",
    "Proanthocyanins",
    "Color_Intensity",
    "Hue",
    "OD280",
    "Proline",
];

/// One wine sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WineRecord {
    pub alcohol: f32,
    pub malic_acid: f32,
    pub ash: f32,
    pub ash_alcanity: f32,
    pub magnesium: f32,
    pub total_phenols: f32,
    pub flavanoids: f32,
    pub nonflavanoid_phenols: f32,
    pub proanthocyanins: f32,
    pub color_intensity: f32,
    pub hue: f32,
    pub od280: f32,
    pub proline: f32,
}

impl WineRecord {
    /// Field values in [`WINE_COLUMNS`] order
    pub fn values(&self) -> [f32; 13] {
        [
            self.alcohol,
            self.malic_acid,
            self.ash,
            self.ash_alcanity,
            self.magnesium,
            self.total_phenols,
            self.flavanoids,
            self.nonflavanoid_phenols,
            self.proanthocyanins,
            self.color_intensity,
            self.hue,
            self.od280,
            self.proline,
        ]
    }

    /// Build a record from values in [`WINE_COLUMNS`] order
    pub fn from_values(v: [f32; 13]) -> Self {
        Self {
            alcohol: v[0],
            malic_acid: v[1],
            ash: v[2],
            ash_alcanity: v[3],
            magnesium: v[4],
            total_phenols: v[5],
            flavanoids: v[6],
            nonflavanoid_phenols: v[7],
            proanthocyanins: v[8],
            color_intensity: v[9],
            hue: v[10],
            od280: v[11],
            proline: v[12],
        }
    }

    /// Position of a column name, if the record has it
    pub fn column_index(column: &str) -> Option<usize> {
        WINE_COLUMNS.iter().position(|c| *c == column)
    }

    /// Look up a field by its column name
    pub fn value(&self, column: &str) -> Option<f32> {
        Self::column_index(column).map(|i| self.values()[i])
    }

    /// (column name, value) pairs in file order
    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f32)> {
        WINE_COLUMNS.into_iter().zip(self.values())
    }
}

/// Lazy reader over the rows of a wine CSV file
pub struct RecordReader {
    path: String,
    rows: StringRecordsIntoIter<File>,
}

impl RecordReader {
    /// Open a file and check its header width
    pub fn open<P: AsRef<Path>>(path: P) -> MlResult<Self> {
        let path_str = path.as_ref().display().to_string();

        let file = File::open(path.as_ref()).map_err(|e| MlError::load(&path_str, e))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .trim(Trim::All)
            .from_reader(file);

        let header_len = reader
            .headers()
            .map_err(|e| MlError::load(&path_str, e))?
            .len();
        if header_len != WINE_COLUMNS.len() {
            return Err(MlError::load(
                &path_str,
                format!(
                    "expected {} comma-separated columns in header, found {}",
                    WINE_COLUMNS.len(),
                    header_len
                ),
            ));
        }

        Ok(Self {
            path: path_str,
            rows: reader.into_records(),
        })
    }

    fn parse_row(&self, row: StringRecord) -> MlResult<WineRecord> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        if row.len() != WINE_COLUMNS.len() {
            return Err(MlError::load(
                &self.path,
                format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    WINE_COLUMNS.len(),
                    row.len()
                ),
            ));
        }

        row.deserialize::<WineRecord>(None)
            .map_err(|e| MlError::load(&self.path, format!("line {}: {}", line, e)))
    }
}

impl Iterator for RecordReader {
    type Item = MlResult<WineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.map_err(|e| MlError::load(&self.path, e))
                .and_then(|r| self.parse_row(r)),
        )
    }
}

/// Load every record of a file, failing on the first bad row
pub fn load_records<P: AsRef<Path>>(path: P) -> MlResult<Vec<WineRecord>> {
    let records = RecordReader::open(&path)?.collect::<MlResult<Vec<_>>>()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        rows = records.len(),
        "loaded wine records"
    );
    Ok(records)
}

/// Write records with a header row in the layout [`RecordReader`] reads
pub fn write_records<W: Write>(writer: W, records: &[WineRecord]) -> MlResult<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer
        .write_record(WINE_COLUMNS)
        .map_err(|e| MlError::Serialization(e.to_string()))?;
    for record in records {
        csv_writer
            .serialize(record)
            .map_err(|e| MlError::Serialization(e.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| MlError::io("<csv writer>", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Alcohol,Malic_Acid,Ash,Ash_Alcanity,Magnesium,Total_Phenols,Flavanoids,Nonflavanoid_Phenols,Proanthocyanins,Color_Intensity,Hue,OD280,Proline";

    fn csv_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_load_well_formed_rows() {
        let file = csv_file(&format!(
            "{}\n14.23,1.71,2.43,15.6,127,2.8,3.06,0.28,2.29,5.64,1.04,3.92,1065\n13.2,1.78,2.14,11.2,100,2.65,2.76,0.26,1.28,4.38,1.05,3.4,1050\n",
            HEADER
        ));

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].alcohol, 14.23);
        assert_eq!(records[0].magnesium, 127.0);
        assert_eq!(records[0].proline, 1065.0);
        assert_eq!(records[1].od280, 3.4);
        assert_eq!(records[1].value("Hue"), Some(1.05));
    }

    #[test]
    fn test_reader_is_lazy() {
        let file = csv_file(&format!(
            "{}\n1,2,3,4,5,6,7,8,9,10,11,12,13\n1,2,3,4,5,6,7,8,9,10,11,12,oops\n",
            HEADER
        ));

        let mut reader = RecordReader::open(file.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next().unwrap(), Err(MlError::Load { .. })));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_non_numeric_field_fails() {
        let file = csv_file(&format!(
            "{}\n14.23,abc,2.43,15.6,127,2.8,3.06,0.28,2.29,5.64,1.04,3.92,1065\n",
            HEADER
        ));

        let err = load_records(file.path()).unwrap_err();
        assert!(matches!(err, MlError::Load { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_records("/definitely/not/here/wine.csv").unwrap_err();
        assert!(matches!(err, MlError::Load { .. }));
    }

    #[test]
    fn test_wrong_separator_fails() {
        let body = format!(
            "{}\n14.23;1.71;2.43;15.6;127;2.8;3.06;0.28;2.29;5.64;1.04;3.92;1065\n",
            HEADER.replace(',', ";")
        );
        let file = csv_file(&body);

        let err = load_records(file.path()).unwrap_err();
        assert!(matches!(err, MlError::Load { .. }));
    }

    #[test]
    fn test_short_row_fails() {
        let file = csv_file(&format!("{}\n14.23,1.71,2.43\n", HEADER));
        assert!(matches!(
            load_records(file.path()),
            Err(MlError::Load { .. })
        ));
    }

    #[test]
    fn test_write_then_load_preserves_values() {
        let records = vec![
            WineRecord::from_values([
                13.4, 2.3, 2.5, 19.8, 99.5, 2.5, 2.3, 0.2, 1.3, 3.1, 0.6, 2.1, 1050.0,
            ]),
            WineRecord::from_values([
                14.0, 1.8, 2.4, 20.5, 99.0, 2.4, 2.1, 0.3, 1.2, 3.0, 0.7, 2.0, 1030.0,
            ]),
        ];

        let mut file = NamedTempFile::new().unwrap();
        write_records(file.as_file_mut(), &records).unwrap();

        let loaded = load_records(file.path()).unwrap();
        assert_eq!(loaded, records);

        // Formatting the loaded values again yields the same file
        let mut first = Vec::new();
        write_records(&mut first, &records).unwrap();
        let mut second = Vec::new();
        write_records(&mut second, &loaded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_named_values_follow_column_order() {
        let record = WineRecord::from_values(std::array::from_fn(|i| i as f32));
        for (i, (name, value)) in record.named_values().enumerate() {
            assert_eq!(name, WINE_COLUMNS[i]);
            assert_eq!(value, i as f32);
        }
        assert_eq!(WineRecord::column_index("Proline"), Some(12));
        assert_eq!(WineRecord::column_index("Sugar"), None);
    }
}
