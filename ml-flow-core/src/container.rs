//! Containers bundling correlated artifacts into a single payload

use std::fmt;
use std::sync::Arc;

use crate::model::Model;
use crate::schema::Schema;

/// A trained model together with the header of its training data
#[derive(Debug)]
pub struct ModelContainer {
    /// The model
    pub model: Model,

    /// Header of the training data, when known
    pub header: Option<Arc<Schema>>,
}

impl ModelContainer {
    /// Create a container without a header
    pub fn new(model: Model) -> Self {
        Self { model, header: None }
    }

    /// Create a container with a header
    pub fn with_header(model: Model, header: Arc<Schema>) -> Self {
        Self {
            model,
            header: Some(header),
        }
    }
}

impl fmt::Display for ModelContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelContainer(model={}", self.model)?;
        match &self.header {
            Some(header) => write!(f, ", header={})", header.relation()),
            None => write!(f, ", header=None)"),
        }
    }
}
