//! Serializer capability for persisted models and headers

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::model::Model;
use crate::schema::Schema;

/// One object stored in a serialized file
#[derive(Debug)]
pub enum SerializedObject {
    /// A model
    Model(Model),

    /// A dataset header
    Header(Schema),

    /// Anything else, identified by its type name
    Other(String),
}

impl SerializedObject {
    /// Type name used in error messages
    pub fn type_name(&self) -> &str {
        match self {
            SerializedObject::Model(m) => m.classname(),
            SerializedObject::Header(_) => "Header",
            SerializedObject::Other(name) => name,
        }
    }
}

/// Reads and writes sequences of objects from and to files
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Read every object stored in a file, in order
    fn read(&self, path: &Path) -> Result<Vec<SerializedObject>>;

    /// Write objects to a file, in order
    fn write(&self, path: &Path, objects: &[SerializedObject]) -> Result<()>;
}
