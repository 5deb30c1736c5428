//! Dataset trait and implementations

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{ClassIndex, Schema};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value
    Missing,

    /// Numeric value (also used for nominal label indices)
    Number(f64),

    /// String value
    Text(String),
}

impl Value {
    /// Numeric view of this value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the value is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "?"),
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A single row of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Vec<Value>,
}

impl Instance {
    /// Create a new instance from its values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get a single value
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of values in this row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this row has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// A dataset represents a collection of rows sharing one header
pub trait Dataset: Send + Sync + fmt::Debug {
    /// Get the header of this dataset
    fn header(&self) -> Arc<Schema>;

    /// Get the number of rows in this dataset
    fn num_rows(&self) -> usize;

    /// Iterate over the rows in order
    fn rows(&self) -> Box<dyn Iterator<Item = &Instance> + '_>;

    /// Create a new dataset with the same rows and a different class attribute
    fn with_class_index(&self, class_index: ClassIndex) -> Result<Arc<dyn Dataset>>;

    /// Schema equality: same attributes (names and types) and same class attribute
    fn schema_equal(&self, other: &dyn Dataset) -> bool {
        self.header().equal_headers(&other.header()).is_none()
    }

    /// Number of attributes
    fn num_attributes(&self) -> usize {
        self.header().len()
    }
}

/// An in-memory dataset backed by a vector of rows
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    /// The header of the dataset
    header: Arc<Schema>,

    /// The rows
    rows: Vec<Instance>,
}

impl InMemoryDataset {
    /// Create a new dataset, validating every row against the header
    pub fn new(header: Arc<Schema>, rows: Vec<Instance>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(Error::SchemaMismatch(format!(
                    "row {} has {} values, header has {} attributes",
                    i,
                    row.len(),
                    header.len()
                )));
            }
        }

        Ok(Self { header, rows })
    }

    /// Create an empty dataset holding only the header
    pub fn template(header: Arc<Schema>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Collect rows from a source until it is exhausted
    pub fn from_rows<I>(header: Arc<Schema>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Instance>>,
    {
        let rows = rows.into_iter().collect::<Result<Vec<_>>>()?;
        Self::new(header, rows)
    }

    /// Get the rows in this dataset
    pub fn instances(&self) -> &[Instance] {
        &self.rows
    }
}

impl Dataset for InMemoryDataset {
    fn header(&self) -> Arc<Schema> {
        self.header.clone()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn rows(&self) -> Box<dyn Iterator<Item = &Instance> + '_> {
        Box::new(self.rows.iter())
    }

    fn with_class_index(&self, class_index: ClassIndex) -> Result<Arc<dyn Dataset>> {
        let header = Arc::new(self.header.with_class_index(class_index)?);
        Ok(Arc::new(InMemoryDataset {
            header,
            rows: self.rows.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, Field};

    fn header() -> Arc<Schema> {
        Arc::new(Schema::new(
            "points",
            vec![
                Field::new("x", DataType::Numeric, false),
                Field::new("y", DataType::Numeric, false),
            ],
        ))
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let rows = vec![Instance::new(vec![Value::Number(1.0)])];
        assert!(matches!(
            InMemoryDataset::new(header(), rows),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_with_class_index_leaves_original_untouched() {
        let data = InMemoryDataset::new(
            header(),
            vec![Instance::new(vec![Value::Number(1.0), Value::Number(2.0)])],
        )
        .unwrap();

        let labelled = data.with_class_index(ClassIndex::Last).unwrap();
        assert_eq!(labelled.header().class_index(), Some(1));
        assert_eq!(data.header().class_index(), None);
        assert_eq!(labelled.num_rows(), 1);
        assert!(!data.schema_equal(labelled.as_ref()));
    }

    #[test]
    fn test_instance_display() {
        let row = Instance::new(vec![Value::Number(1.5), Value::Missing, Value::Text("a".into())]);
        assert_eq!(row.to_string(), "1.5,?,a");
    }
}
