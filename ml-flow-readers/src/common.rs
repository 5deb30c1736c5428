//! Common utilities shared by the loaders

use std::path::Path;

use ml_flow_core::{DataType, Field};

use crate::error::{Error, Result};

/// Options for text-based loaders
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Maximum number of rows to read for schema inference
    pub schema_inference_rows: usize,

    /// Token standing for a missing value (empty cells are always missing)
    pub missing_value: String,

    /// Non-numeric columns with more distinct values than this become strings
    pub max_nominal_labels: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            schema_inference_rows: 1000,
            missing_value: "?".to_string(),
            max_nominal_labels: 100,
        }
    }
}

/// Formats a loader can be chosen for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma separated values
    Csv,

    /// Tab separated values
    Tsv,
}

impl FileFormat {
    /// Detect the format of a file based on its extension
    pub fn detect_from_path(path: &Path) -> Option<FileFormat> {
        let extension = path.extension()?.to_str()?.to_lowercase();

        match extension.as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            _ => None,
        }
    }

    /// Field delimiter of this format
    pub fn delimiter(self) -> u8 {
        match self {
            FileFormat::Csv => b',',
            FileFormat::Tsv => b'\t',
        }
    }
}

/// Schema inference utilities
pub struct SchemaInference;

impl SchemaInference {
    /// Infer fields from string records
    pub fn infer_from_string_records(
        records: &[Vec<String>],
        header: Option<Vec<String>>,
        options: &ReaderOptions,
    ) -> Result<Vec<Field>> {
        let column_count = match (&header, records.first()) {
            (Some(header), _) => header.len(),
            (None, Some(first)) => first.len(),
            (None, None) => {
                return Err(Error::InvalidArgument("Cannot infer schema from empty data".into()));
            }
        };

        if let Some(row) = records.iter().position(|r| r.len() != column_count) {
            return Err(Error::Schema(format!(
                "Record {} has {} columns, expected {}",
                row + 1,
                records[row].len(),
                column_count
            )));
        }

        let column_names = header.unwrap_or_else(|| (1..=column_count).map(|i| format!("att{}", i)).collect());

        let fields = column_names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let values: Vec<&str> = records.iter().map(|r| r[col].as_str()).collect();
                let data_type = Self::infer_data_type(&values, options);
                Field::new(name, data_type, true)
            })
            .collect();

        Ok(fields)
    }

    /// Whether a raw cell is a missing value
    pub fn is_missing(value: &str, options: &ReaderOptions) -> bool {
        let value = value.trim();
        value.is_empty() || value == options.missing_value
    }

    /// Infer the data type of a column of string values
    pub fn infer_data_type(values: &[&str], options: &ReaderOptions) -> DataType {
        let present: Vec<&str> = values
            .iter()
            .map(|s| s.trim())
            .filter(|s| !Self::is_missing(s, options))
            .collect();

        if present.is_empty() {
            return DataType::String;
        }

        if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            return DataType::Numeric;
        }

        let mut labels: Vec<String> = Vec::new();
        for value in present {
            if !labels.iter().any(|l| l == value) {
                labels.push(value.to_string());
                if labels.len() > options.max_nominal_labels {
                    return DataType::String;
                }
            }
        }

        DataType::Nominal(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use test_case::test_case;

    #[test_case("iris.csv", Some(FileFormat::Csv))]
    #[test_case("data/IRIS.CSV", Some(FileFormat::Csv))]
    #[test_case("table.tsv", Some(FileFormat::Tsv))]
    #[test_case("model.bin", None)]
    #[test_case("noext", None)]
    fn test_detect_from_path(path: &str, expected: Option<FileFormat>) {
        assert_eq!(FileFormat::detect_from_path(&PathBuf::from(path)), expected);
    }

    #[test]
    fn test_infer_data_type() {
        let options = ReaderOptions::default();
        assert_eq!(SchemaInference::infer_data_type(&["1", "2.5", "?"], &options), DataType::Numeric);
        assert_eq!(
            SchemaInference::infer_data_type(&["yes", "no", "", "yes"], &options),
            DataType::Nominal(vec!["yes".into(), "no".into()])
        );
        assert_eq!(SchemaInference::infer_data_type(&["?", ""], &options), DataType::String);

        let narrow = ReaderOptions {
            max_nominal_labels: 1,
            ..ReaderOptions::default()
        };
        assert_eq!(SchemaInference::infer_data_type(&["a", "b"], &narrow), DataType::String);
    }

    #[test]
    fn test_infer_fields() {
        let records = vec![
            vec!["1".to_string(), "a".to_string()],
            vec!["2".to_string(), "b".to_string()],
        ];
        let fields = SchemaInference::infer_from_string_records(&records, None, &ReaderOptions::default()).unwrap();
        assert_eq!(fields[0].name(), "att1");
        assert!(fields[0].data_type().is_numeric());
        assert!(fields[1].data_type().is_nominal());

        let ragged = vec![vec!["1".to_string()], vec!["1".to_string(), "2".to_string()]];
        assert!(SchemaInference::infer_from_string_records(&ragged, None, &ReaderOptions::default()).is_err());
    }
}
