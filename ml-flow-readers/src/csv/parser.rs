//! CSV parser converting string records into rows

use std::sync::Arc;

use csv::StringRecord;
use ml_flow_core::{DataType, Instance, Schema, Value};

use crate::common::{ReaderOptions, SchemaInference};
use crate::error::{Error, Result};

/// Converts CSV records into rows of a fixed schema
#[derive(Debug, Clone)]
pub struct CsvParser {
    /// Schema for the CSV data
    schema: Arc<Schema>,

    /// Reader options (missing value token)
    options: ReaderOptions,
}

impl CsvParser {
    /// Create a new CSV parser
    pub fn new(schema: Arc<Schema>, options: ReaderOptions) -> Self {
        Self { schema, options }
    }

    /// Schema the parser produces rows for
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Parse one record; `line` is used in error messages
    pub fn parse_record<'a, I>(&self, record: I, line: u64) -> Result<Instance>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = Vec::with_capacity(self.schema.len());

        for (col, raw) in record.into_iter().enumerate() {
            let field = self.schema.field(col).ok_or_else(|| {
                Error::Format(format!(
                    "line {}: more than {} values",
                    line,
                    self.schema.len()
                ))
            })?;

            let raw = raw.trim();
            if SchemaInference::is_missing(raw, &self.options) {
                values.push(Value::Missing);
                continue;
            }

            let value = match field.data_type() {
                DataType::Numeric => raw.parse::<f64>().map(Value::Number).map_err(|_| {
                    Error::Format(format!(
                        "line {}: '{}' is not numeric (attribute '{}')",
                        line,
                        raw,
                        field.name()
                    ))
                })?,
                DataType::Nominal(_) | DataType::String => Value::Text(raw.to_string()),
            };
            values.push(value);
        }

        if values.len() != self.schema.len() {
            return Err(Error::Format(format!(
                "line {}: {} values, expected {}",
                line,
                values.len(),
                self.schema.len()
            )));
        }

        Ok(Instance::new(values))
    }

    /// Parse a csv record
    pub fn parse_string_record(&self, record: &StringRecord) -> Result<Instance> {
        let line = record.position().map_or(0, csv::Position::line);
        self.parse_record(record.iter(), line)
    }
}
