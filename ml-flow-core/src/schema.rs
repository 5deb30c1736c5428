//! Schema ("header") definition for datasets flowing through a pipeline

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Numeric attribute (integers and floats alike)
    Numeric,

    /// Nominal attribute with a fixed, ordered set of labels
    Nominal(Vec<String>),

    /// Free-form string attribute
    String,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Numeric)
    }

    /// Check if this type is nominal
    pub fn is_nominal(&self) -> bool {
        matches!(self, DataType::Nominal(_))
    }

    /// Index of a label for nominal types
    pub fn label_index(&self, label: &str) -> Option<usize> {
        match self {
            DataType::Nominal(labels) => labels.iter().position(|l| l == label),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Numeric => write!(f, "numeric"),
            DataType::Nominal(labels) => write!(f, "{{{}}}", labels.join(",")),
            DataType::String => write!(f, "string"),
        }
    }
}

/// A field in a schema, with a name, data type, and nullability
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Name of the field
    pub name: String,

    /// Data type of the field
    pub data_type: DataType,

    /// Whether the field can hold missing values
    pub nullable: bool,
}

impl Field {
    /// Create a new field
    pub fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
        }
    }

    /// Get the name of this field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this field
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Check if this field is nullable
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@attribute {} {}", self.name, self.data_type)
    }
}

/// Target column designation, as accepted by the class selection step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassIndex {
    /// The first column
    First,

    /// The last column
    Last,

    /// An explicit 0-based column index
    At(usize),

    /// No target column
    Unset,
}

impl ClassIndex {
    /// Parse the textual form used in option values: `first`, `last`, or a 1-based number
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.to_ascii_lowercase().as_str() {
            "first" => Ok(ClassIndex::First),
            "last" => Ok(ClassIndex::Last),
            _ => {
                let one_based: usize = text.parse().map_err(|_| Error::InvalidOption {
                    option: "index".into(),
                    reason: format!("expected 'first', 'last' or a 1-based number, got '{}'", text),
                })?;
                if one_based == 0 {
                    return Err(Error::InvalidOption {
                        option: "index".into(),
                        reason: "class index is 1-based".into(),
                    });
                }
                Ok(ClassIndex::At(one_based - 1))
            }
        }
    }

    /// Resolve to a concrete 0-based index for a schema with `len` fields
    pub fn resolve(self, len: usize) -> Result<Option<usize>> {
        let index = match self {
            ClassIndex::Unset => return Ok(None),
            ClassIndex::First => 0,
            ClassIndex::Last => len.saturating_sub(1),
            ClassIndex::At(index) => index,
        };

        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        Ok(Some(index))
    }
}

/// A schema describing a dataset's structure, including its class attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Relation name
    relation: String,

    /// Fields in this schema
    fields: Vec<Field>,

    /// Field indices by name for faster lookup
    #[serde(skip)]
    field_indices: HashMap<String, usize>,

    /// Index of the class (target) attribute
    class_index: Option<usize>,

    /// Additional metadata
    metadata: Option<HashMap<String, String>>,
}

impl Schema {
    /// Create a new schema with the given fields and no class attribute
    pub fn new(relation: &str, fields: Vec<Field>) -> Self {
        let field_indices = Self::index_fields(&fields);

        Self {
            relation: relation.to_string(),
            fields,
            field_indices,
            class_index: None,
            metadata: None,
        }
    }

    fn index_fields(fields: &[Field]) -> HashMap<String, usize> {
        let mut field_indices = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            field_indices.insert(field.name.clone(), i);
        }
        field_indices
    }

    /// Get the relation name
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Get all fields in this schema
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by index
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Get the index of a field by name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.field_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::Dataset(format!("Field not found: {}", name)))
    }

    /// Get the number of fields in this schema
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this schema is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of the class attribute, if one is set
    pub fn class_index(&self) -> Option<usize> {
        self.class_index
    }

    /// The class attribute, if one is set
    pub fn class_field(&self) -> Option<&Field> {
        self.class_index.and_then(|i| self.fields.get(i))
    }

    /// Return a copy of this schema with the class attribute changed
    pub fn with_class_index(&self, class_index: ClassIndex) -> Result<Self> {
        let mut schema = self.clone();
        schema.class_index = class_index.resolve(self.fields.len())?;
        Ok(schema)
    }

    /// Get a specific metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.get(key).map(String::as_str))
    }

    /// Set a metadata value
    pub fn set_metadata_value(&mut self, key: &str, value: &str) {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
    }

    /// Compare two headers. Returns `None` when they are compatible, otherwise
    /// a message describing the first difference.
    pub fn equal_headers(&self, other: &Schema) -> Option<String> {
        if self.fields.len() != other.fields.len() {
            return Some(format!(
                "Attribute count differs: {} != {}",
                self.fields.len(),
                other.fields.len()
            ));
        }

        if self.class_index != other.class_index {
            return Some(format!(
                "Class index differs: {:?} != {:?}",
                self.class_index, other.class_index
            ));
        }

        for (i, (a, b)) in self.fields.iter().zip(other.fields.iter()).enumerate() {
            if a.name != b.name {
                return Some(format!("Attribute names differ at position {}: {} != {}", i + 1, a.name, b.name));
            }
            if a.data_type != b.data_type {
                return Some(format!(
                    "Attribute types differ at position {}: {} != {}",
                    i + 1,
                    a.data_type,
                    b.data_type
                ));
            }
        }

        None
    }

    /// Serialize this schema to a binary format
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Serialization)
    }

    /// Deserialize a schema from a binary format
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut schema: Self = bincode::deserialize(data).map_err(Error::Serialization)?;

        // Rebuild the field indices
        schema.field_indices = Self::index_fields(&schema.fields);

        Ok(schema)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@relation {}", self.relation)?;
        for field in &self.fields {
            writeln!(f, "{}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn iris() -> Schema {
        Schema::new(
            "iris",
            vec![
                Field::new("sepallength", DataType::Numeric, false),
                Field::new("sepalwidth", DataType::Numeric, false),
                Field::new(
                    "class",
                    DataType::Nominal(vec!["setosa".into(), "versicolor".into()]),
                    false,
                ),
            ],
        )
    }

    #[test_case("first", Some(0) ; "first column")]
    #[test_case("last", Some(2) ; "last column")]
    #[test_case("LAST", Some(2) ; "case insensitive")]
    #[test_case("2", Some(1) ; "one based number")]
    fn test_class_index_resolution(text: &str, expected: Option<usize>) {
        let schema = iris().with_class_index(ClassIndex::parse(text).unwrap()).unwrap();
        assert_eq!(schema.class_index(), expected);
    }

    #[test]
    fn test_class_index_out_of_range() {
        let err = iris().with_class_index(ClassIndex::parse("4").unwrap()).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 3, len: 3 }));
        assert!(ClassIndex::parse("0").is_err());
        assert!(matches!(ClassIndex::Last.resolve(0), Err(Error::IndexOutOfBounds { index: 0, len: 0 })));
        assert!(matches!(ClassIndex::First.resolve(0), Err(Error::IndexOutOfBounds { index: 0, len: 0 })));
        assert!(ClassIndex::parse("middle").is_err());
    }

    #[test]
    fn test_equal_headers() {
        let a = iris();
        assert!(a.equal_headers(&iris()).is_none());

        let with_class = a.with_class_index(ClassIndex::Last).unwrap();
        assert!(a.equal_headers(&with_class).unwrap().contains("Class index"));

        let renamed = Schema::new(
            "iris",
            vec![
                Field::new("sepallength", DataType::Numeric, false),
                Field::new("petalwidth", DataType::Numeric, false),
                Field::new("class", DataType::String, false),
            ],
        );
        assert!(a.equal_headers(&renamed).unwrap().contains("position 2"));
    }

    #[test]
    fn test_schema_binary_round_trip_rebuilds_lookup() {
        let schema = iris().with_class_index(ClassIndex::Last).unwrap();
        let restored = Schema::deserialize(&schema.serialize().unwrap()).unwrap();
        assert_eq!(restored.index_of("class").unwrap(), 2);
        assert_eq!(restored.class_index(), Some(2));
    }
}
