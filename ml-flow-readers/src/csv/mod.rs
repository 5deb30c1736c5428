//! CSV loading, whole or row by row
//!
//! The header is inferred from the leading rows: columns whose present
//! values all parse as numbers become numeric, the others nominal (or string
//! when they carry too many distinct labels).

mod parser;
mod reader;

pub use parser::CsvParser;
pub use reader::{CsvLoader, CsvLoaderOptions, CsvRows};

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::source::{Loaded, Loader};
    use ml_flow_core::{ClassIndex, DataType, Dataset, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WEATHER: &str = "\
outlook,temperature,play
sunny,85,no
overcast,83,yes
rainy,?,yes
";

    fn write_file(contents: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_batch_load() {
        let file = write_file(WEATHER, ".csv");
        let loaded = CsvLoader::default().load(file.path(), false).unwrap();

        let Loaded::Batch(data) = loaded else {
            panic!("expected a batch");
        };
        assert_eq!(data.num_rows(), 3);
        let header = data.header();
        assert_eq!(header.len(), 3);
        assert_eq!(header.fields()[0].name(), "outlook");
        assert!(header.fields()[1].data_type().is_numeric());
        assert_eq!(
            header.fields()[2].data_type(),
            &DataType::Nominal(vec!["no".into(), "yes".into()])
        );
        assert_eq!(header.class_index(), None);

        let third = data.rows().nth(2).unwrap();
        assert_eq!(third.value(1), Some(&Value::Missing));
    }

    #[test]
    fn test_incremental_load_keeps_order() {
        let file = write_file(WEATHER, ".csv");
        let loader = CsvLoader::new(CsvLoaderOptions {
            reader_options: crate::common::ReaderOptions {
                schema_inference_rows: 1,
                ..Default::default()
            },
            ..Default::default()
        });

        let Loaded::Incremental { header, rows } = loader.load(file.path(), true).unwrap() else {
            panic!("expected a row stream");
        };
        assert_eq!(header.len(), 3);

        let outlooks: Vec<String> = rows.map(|r| r.unwrap().values()[0].to_string()).collect();
        assert_eq!(outlooks, vec!["sunny", "overcast", "rainy"]);
    }

    #[test]
    fn test_class_index_and_tab_delimiter() {
        let file = write_file("a\tb\n1\tx\n2\ty\n", ".tsv");
        let args: Vec<String> = ["-F", "\\t", "-C", "last"].iter().map(|s| s.to_string()).collect();
        let loader = CsvLoader::from_args(&args).unwrap();
        assert_eq!(loader.settings().class_index, Some(ClassIndex::Last));
        assert_eq!(loader.commandline(), "converters.CSVLoader -F \\t -C last");

        let Loaded::Batch(data) = loader.load(file.path(), false).unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(data.header().class_index(), Some(1));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let file = write_file("x,y\n1,2\n3,4,5\n", ".csv");
        assert!(CsvLoader::default().load(file.path(), false).is_err());
    }

    #[test]
    fn test_bad_value_after_sample_is_a_row_error() {
        let file = write_file("x\n1\n2\noops\n", ".csv");
        let loader = CsvLoader::new(CsvLoaderOptions {
            reader_options: crate::common::ReaderOptions {
                schema_inference_rows: 2,
                ..Default::default()
            },
            ..Default::default()
        });

        let Loaded::Incremental { rows, .. } = loader.load(file.path(), true).unwrap() else {
            panic!("expected a row stream");
        };
        let results: Vec<_> = rows.collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(results[2], Err(ml_flow_core::Error::Dataset(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvLoader::default()
            .load(std::path::Path::new("/nonexistent/data.csv"), false)
            .unwrap_err();
        assert!(matches!(err, ml_flow_core::Error::Io(_)));
    }

    #[test]
    fn test_unknown_option() {
        assert!(CsvLoader::from_args(&["-X".to_string(), "1".to_string()]).is_err());
        assert!(CsvLoader::from_args(&["-F".to_string()]).is_err());
    }
}
