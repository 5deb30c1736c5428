//! Loading datasets from files, whole or row by row

use std::path::Path;

use ml_flow_core::options::{from_option_map, option_str, resolve, to_option_map};
use ml_flow_core::source::{Loaded, Loader};
use ml_flow_core::{
    Accepts, ComponentRegistry, Error, FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue, PayloadKind,
    Result, Token, TokenSequence, Transformer,
};
use ml_flow_readers::csv::CsvLoader;
use ml_flow_readers::loader_for_file;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::text_input;

const HELP: &[OptionHelp] = &[
    OptionHelp::new("incremental", "Whether to load the dataset incrementally (bool)."),
    OptionHelp::new("use_custom_loader", "Whether to use a custom loader."),
    OptionHelp::new("custom_loader", "The custom loader to use (Loader)."),
];

/// Options of [`LoadDataset`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadDatasetOptions {
    /// Forward one token per row instead of one dataset
    pub incremental: OptionValue<bool>,

    /// Use `custom_loader` instead of choosing a loader by file extension
    pub use_custom_loader: OptionValue<bool>,

    /// Loader template used when `use_custom_loader` is set
    #[serde(skip)]
    pub custom_loader: Box<dyn Loader>,
}

impl Default for LoadDatasetOptions {
    fn default() -> Self {
        Self {
            incremental: OptionValue::Value(false),
            use_custom_loader: OptionValue::Value(false),
            custom_loader: Box::new(CsvLoader::default()),
        }
    }
}

impl OptionHandler for LoadDatasetOptions {
    fn help() -> &'static [OptionHelp] {
        HELP
    }

    fn to_options(&self) -> Result<Value> {
        let mut map = to_option_map(self)?;
        map.insert("custom_loader".into(), Value::String(self.custom_loader.commandline()));
        Ok(Value::Object(map))
    }

    fn from_options(options: &Value, registry: &ComponentRegistry) -> Result<Self> {
        let mut record: Self = from_option_map(options, HELP)?;
        if let Some(commandline) = option_str(options, "custom_loader")? {
            record.custom_loader = registry.loader(commandline)?;
        }
        Ok(record)
    }
}

/// Loads the file named by the input token
///
/// In batch mode one dataset token is forwarded. In incremental mode the rows
/// are handed out lazily as instance tokens, in file order.
#[derive(Debug, Default)]
pub struct LoadDataset {
    options: LoadDatasetOptions,
}

impl LoadDataset {
    /// Kind name
    pub const KIND: &'static str = "LoadDataset";

    /// Create the transformer
    pub fn new(options: LoadDatasetOptions) -> Self {
        Self { options }
    }
}

impl Transformer for LoadDataset {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Loads a dataset from a file. Either all at once or incrementally."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!(
            "incremental: {}, custom: {}, loader: {}",
            self.options.incremental,
            self.options.use_custom_loader,
            self.options.custom_loader.commandline()
        ))
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Text])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        LoadDatasetOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let path = Path::new(text_input(Self::KIND, input)?);
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }

        let incremental = resolve(ctx, "incremental", &self.options.incremental)?;
        let loader = if resolve(ctx, "use_custom_loader", &self.options.use_custom_loader)? {
            self.options.custom_loader.copy()
        } else {
            loader_for_file(path)?
        };
        debug!(path = %path.display(), loader = %loader.commandline(), incremental, "loading dataset");

        match loader.load(path, incremental)? {
            Loaded::Batch(data) => output.push(Token::new(data)),
            Loaded::Incremental { rows, .. } => {
                output.set_sequence(TokenSequence::from_items(rows.map(|row| row.map(Token::new))));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::testing::{self, MemoryLoader};
    use ml_flow_core::{Actor, Dataset};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn path_token(file: &NamedTempFile) -> Token {
        Token::new(file.path().to_string_lossy().into_owned())
    }

    #[test]
    fn test_batch_load_by_extension() {
        let file = csv_file("x,y\n1,a\n2,b\n");
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("load", Box::new(LoadDataset::default()));

        actor.input(path_token(&file)).unwrap();
        actor.execute(&mut ctx).unwrap();
        let token = actor.output().unwrap();
        assert_eq!(token.payload().as_dataset().unwrap().num_rows(), 2);
        assert!(!actor.has_output());
    }

    #[test]
    fn test_incremental_load_in_order() {
        let file = csv_file("x\n1\n2\n3\n");
        let mut ctx = FlowContext::new();
        ctx.storage_mut().unwrap().set("stream", true);
        let options = LoadDatasetOptions {
            incremental: OptionValue::text("@{stream}"),
            ..Default::default()
        };
        let mut actor = Actor::new("load", Box::new(LoadDataset::new(options)));

        actor.input(path_token(&file)).unwrap();
        actor.execute(&mut ctx).unwrap();
        let mut values = Vec::new();
        while actor.has_output() {
            let token = actor.output().unwrap();
            values.push(token.payload().as_instance().unwrap().values()[0].as_f64().unwrap());
        }
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_custom_loader() {
        let registry = testing::registry();
        let options = LoadDatasetOptions::from_options(
            &json!({"use_custom_loader": true, "custom_loader": MemoryLoader::CLASSNAME}),
            &registry,
        )
        .unwrap();
        let file = NamedTempFile::new().unwrap();
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("load", Box::new(LoadDataset::new(options)));

        actor.input(path_token(&file)).unwrap();
        actor.execute(&mut ctx).unwrap();
        let data = actor.output().unwrap();
        assert_eq!(data.payload().as_dataset().unwrap().header().relation(), "weather");
    }

    #[test]
    fn test_missing_file_and_directory() {
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("load", Box::new(LoadDataset::default()));

        actor.input(Token::new("/nonexistent/data.csv")).unwrap();
        let err = actor.execute(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "File '/nonexistent/data.csv' does not exist!");

        let dir = tempfile::tempdir().unwrap();
        actor.input(Token::new(dir.path().to_string_lossy().into_owned())).unwrap();
        assert!(matches!(actor.execute(&mut ctx), Err(Error::NotAFile(_))));
    }

    #[test]
    fn test_unknown_extension_without_custom_loader() {
        let file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("load", Box::new(LoadDataset::default()));
        actor.input(path_token(&file)).unwrap();
        assert!(actor.execute(&mut ctx).is_err());
    }

    #[test]
    fn test_options_and_quickinfo() {
        let transformer = LoadDataset::default();
        assert_eq!(
            transformer.to_options().unwrap(),
            json!({"incremental": false, "use_custom_loader": false, "custom_loader": "converters.CSVLoader"})
        );
        assert_eq!(
            transformer.quickinfo().unwrap(),
            "incremental: false, custom: false, loader: converters.CSVLoader"
        );
    }
}
