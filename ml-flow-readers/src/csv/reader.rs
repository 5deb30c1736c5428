//! CSV loader implementation

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use ml_flow_core::source::{Loaded, Loader};
use ml_flow_core::{ClassIndex, InMemoryDataset, Instance, Schema};
use tracing::debug;

use crate::common::{ReaderOptions, SchemaInference};
use crate::error::{Error, Result};

use super::parser::CsvParser;

/// Options for the CSV loader
#[derive(Debug, Clone)]
pub struct CsvLoaderOptions {
    /// Whether the CSV has a header row
    pub has_header: bool,

    /// Delimiter character
    pub delimiter: u8,

    /// Quote character
    pub quote: u8,

    /// Comment character
    pub comment: Option<u8>,

    /// Class attribute to set on the loaded header
    pub class_index: Option<ClassIndex>,

    /// Core reader options
    pub reader_options: ReaderOptions,
}

impl Default for CsvLoaderOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            comment: None,
            class_index: None,
            reader_options: ReaderOptions::default(),
        }
    }
}

fn byte_to_arg(byte: u8) -> String {
    match byte {
        b'\t' => "\\t".to_string(),
        other => char::from(other).to_string(),
    }
}

fn arg_to_byte(flag: &str, arg: &str) -> Result<u8> {
    match arg {
        "\\t" | "tab" => Ok(b'\t'),
        _ if arg.len() == 1 => Ok(arg.as_bytes()[0]),
        _ => Err(Error::InvalidArgument(format!(
            "{} expects a single character, got '{}'",
            flag, arg
        ))),
    }
}

fn class_index_to_arg(index: ClassIndex) -> Option<String> {
    match index {
        ClassIndex::First => Some("first".into()),
        ClassIndex::Last => Some("last".into()),
        ClassIndex::At(i) => Some((i + 1).to_string()),
        ClassIndex::Unset => None,
    }
}

impl CsvLoaderOptions {
    /// Command line options differing from the defaults
    pub fn to_args(&self) -> Vec<String> {
        let defaults = Self::default();
        let mut args = Vec::new();

        if self.delimiter != defaults.delimiter {
            args.extend(["-F".to_string(), byte_to_arg(self.delimiter)]);
        }
        if self.quote != defaults.quote {
            args.extend(["-Q".to_string(), byte_to_arg(self.quote)]);
        }
        if let Some(comment) = self.comment {
            args.extend(["-K".to_string(), byte_to_arg(comment)]);
        }
        if !self.has_header {
            args.push("-N".to_string());
        }
        if let Some(index) = self.class_index.and_then(class_index_to_arg) {
            args.extend(["-C".to_string(), index]);
        }
        if self.reader_options.missing_value != defaults.reader_options.missing_value {
            args.extend(["-M".to_string(), self.reader_options.missing_value.clone()]);
        }
        if self.reader_options.schema_inference_rows != defaults.reader_options.schema_inference_rows {
            args.extend(["-R".to_string(), self.reader_options.schema_inference_rows.to_string()]);
        }
        if self.reader_options.max_nominal_labels != defaults.reader_options.max_nominal_labels {
            args.extend(["-L".to_string(), self.reader_options.max_nominal_labels.to_string()]);
        }

        args
    }

    /// Parse command line options
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut options = Self::default();
        let mut iter = args.iter();

        while let Some(flag) = iter.next() {
            if flag == "-N" {
                options.has_header = false;
                continue;
            }

            let value = iter
                .next()
                .ok_or_else(|| Error::InvalidArgument(format!("{} expects a value", flag)))?;
            match flag.as_str() {
                "-F" => options.delimiter = arg_to_byte(flag, value)?,
                "-Q" => options.quote = arg_to_byte(flag, value)?,
                "-K" => options.comment = Some(arg_to_byte(flag, value)?),
                "-C" => options.class_index = Some(ClassIndex::parse(value)?),
                "-M" => options.reader_options.missing_value = value.clone(),
                "-R" => {
                    options.reader_options.schema_inference_rows = value
                        .parse()
                        .map_err(|_| Error::InvalidArgument(format!("-R expects a number, got '{}'", value)))?;
                }
                "-L" => {
                    options.reader_options.max_nominal_labels = value
                        .parse()
                        .map_err(|_| Error::InvalidArgument(format!("-L expects a number, got '{}'", value)))?;
                }
                other => return Err(Error::InvalidArgument(format!("unknown CSV loader option '{}'", other))),
            }
        }

        Ok(options)
    }
}

/// Loader for delimited text files
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    /// Loader options
    settings: CsvLoaderOptions,
}

impl CsvLoader {
    /// Scheme name
    pub const CLASSNAME: &'static str = "converters.CSVLoader";

    /// Create a loader
    pub fn new(settings: CsvLoaderOptions) -> Self {
        Self { settings }
    }

    /// Create a loader from command line options
    pub fn from_args(args: &[String]) -> Result<Self> {
        Ok(Self::new(CsvLoaderOptions::from_args(args)?))
    }

    /// The loader options
    pub fn settings(&self) -> &CsvLoaderOptions {
        &self.settings
    }

    /// Open a file, infer its header from the leading rows and return a row stream
    pub fn open(&self, path: &Path) -> Result<(Arc<Schema>, CsvRows)> {
        let settings = &self.settings;
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(settings.delimiter)
            .quote(settings.quote)
            .comment(settings.comment)
            .has_headers(settings.has_header)
            .from_reader(file);

        let header = if settings.has_header {
            Some(reader.headers()?.iter().map(|s| s.trim().to_string()).collect())
        } else {
            None
        };

        let mut sample = VecDeque::new();
        let mut record = StringRecord::new();
        while sample.len() < settings.reader_options.schema_inference_rows && reader.read_record(&mut record)? {
            sample.push_back(record.clone());
        }

        let records: Vec<Vec<String>> = sample
            .iter()
            .map(|r| r.iter().map(str::to_string).collect())
            .collect();
        let fields = SchemaInference::infer_from_string_records(&records, header, &settings.reader_options)?;

        let relation = path.file_stem().and_then(|s| s.to_str()).unwrap_or("data");
        let mut schema = Schema::new(relation, fields);
        if let Some(class_index) = settings.class_index {
            schema = schema.with_class_index(class_index)?;
        }
        let schema = Arc::new(schema);

        debug!(
            path = %path.display(),
            attributes = schema.len(),
            sampled = sample.len(),
            "opened csv file"
        );

        let parser = CsvParser::new(Arc::clone(&schema), settings.reader_options.clone());
        Ok((
            schema,
            CsvRows {
                reader,
                parser,
                sample,
                record: StringRecord::new(),
                done: false,
            },
        ))
    }
}

impl Loader for CsvLoader {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn options(&self) -> Vec<String> {
        self.settings.to_args()
    }

    fn copy(&self) -> Box<dyn Loader> {
        Box::new(self.clone())
    }

    fn load(&self, path: &Path, incremental: bool) -> ml_flow_core::Result<Loaded> {
        let (header, rows) = self.open(path)?;

        if incremental {
            return Ok(Loaded::Incremental {
                header,
                rows: Box::new(rows),
            });
        }

        let data = InMemoryDataset::from_rows(header, rows)?;
        debug!(path = %path.display(), rows = data.instances().len(), "loaded csv file");
        Ok(Loaded::Batch(Arc::new(data)))
    }
}

/// Lazy row stream over a CSV file
///
/// Rows sampled for schema inference are handed out first, then the rest of
/// the file is read record by record.
pub struct CsvRows {
    reader: csv::Reader<File>,
    parser: CsvParser,
    sample: VecDeque<StringRecord>,
    record: StringRecord,
    done: bool,
}

impl Iterator for CsvRows {
    type Item = ml_flow_core::Result<Instance>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(record) = self.sample.pop_front() {
            return Some(self.parser.parse_string_record(&record).map_err(Into::into));
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(self.parser.parse_string_record(&self.record).map_err(Into::into)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(Error::from(e).into()))
            }
        }
    }
}

impl std::fmt::Debug for CsvRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRows")
            .field("relation", &self.parser.schema().relation())
            .field("buffered", &self.sample.len())
            .field("done", &self.done)
            .finish()
    }
}
