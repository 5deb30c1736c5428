//! Reading persisted models

use std::path::Path;
use std::sync::Arc;

use ml_flow_core::serialization::{SerializedObject, Serializer};
use ml_flow_core::{
    Accepts, Error, FlowContext, ModelContainer, ModelKind, OptionHelp, OutputQueue, PayloadKind, Result, Token,
    Transformer,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::text_input;

/// Reads a serialized model, optionally followed by its training header
///
/// The file must hold one or two objects: a classifier or clusterer, then
/// optionally the header of the data it was trained on.
#[derive(Debug, Clone)]
pub struct ModelReader {
    serializer: Arc<dyn Serializer>,
}

impl ModelReader {
    /// Kind name
    pub const KIND: &'static str = "ModelReader";

    /// Create the transformer
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }

    fn container(path: &Path, objects: Vec<SerializedObject>) -> Result<ModelContainer> {
        let found = objects.len();
        let mut objects = objects.into_iter();
        let (Some(first), second, None) = (objects.next(), objects.next(), objects.next()) else {
            return Err(Error::ObjectCount {
                found,
                path: path.to_path_buf(),
            });
        };

        let model = match first {
            SerializedObject::Model(model) if model.kind() != ModelKind::Associator => model,
            other => return Err(Error::UnhandledClass(other.type_name().to_string())),
        };

        match second {
            None => Ok(ModelContainer::new(model)),
            Some(SerializedObject::Header(header)) => Ok(ModelContainer::with_header(model, Arc::new(header))),
            Some(other) => Err(Error::UnhandledClass(other.type_name().to_string())),
        }
    }
}

impl Transformer for ModelReader {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Reads the serialized model from disk and forwards a ModelContainer."
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Text])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        &[]
    }

    fn to_options(&self) -> Result<Value> {
        Ok(Value::Object(Map::new()))
    }

    fn do_execute(&mut self, input: &Token, _ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let path = Path::new(text_input(Self::KIND, input)?);
        let container = Self::container(path, self.serializer.read(path)?)?;
        debug!(path = %path.display(), container = %container, "read model");
        output.push(Token::new(container));
        Ok(())
    }
}
