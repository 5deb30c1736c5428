//! Concrete transformers for ML dataflow pipelines
//!
//! Every transformer keeps its configuration in a typed options record that
//! implements [`ml_flow_core::OptionHandler`]. Actors are usually built by
//! kind name through [`create`]:
//!
//! ```no_run
//! use ml_flow_core::{ComponentRegistry, FlowContext, Token};
//! use serde_json::json;
//!
//! let registry = ComponentRegistry::new();
//! let mut actor = ml_flow_transformers::create(
//!     "MathExpression",
//!     "double",
//!     &json!({"expression": "{X} * 2"}),
//!     &registry,
//! )?;
//!
//! let mut ctx = FlowContext::new();
//! actor.input(Token::new(21_i64))?;
//! actor.execute(&mut ctx)?;
//! assert_eq!(actor.output().and_then(|t| t.payload().as_f64()), Some(42.0));
//! # Ok::<(), ml_flow_core::Error>(())
//! ```

#![warn(missing_docs)]

/// Implement `OptionHandler` for a record made of serde-friendly fields only
macro_rules! primitive_options {
    ($record:ty, $help:expr) => {
        impl ml_flow_core::OptionHandler for $record {
            fn help() -> &'static [ml_flow_core::OptionHelp] {
                $help
            }

            fn to_options(&self) -> ml_flow_core::Result<serde_json::Value> {
                Ok(serde_json::Value::Object(ml_flow_core::options::to_option_map(self)?))
            }

            fn from_options(
                options: &serde_json::Value,
                _registry: &ml_flow_core::ComponentRegistry,
            ) -> ml_flow_core::Result<Self> {
                ml_flow_core::options::from_option_map(options, $help)
            }
        }
    };
}

mod dataset;
mod evaluation;
mod factory;
mod files;
mod load;
mod math;
mod model;
mod model_reader;
mod passthrough;
mod storage;

pub use dataset::{ClassSelector, ClassSelectorOptions, Filter, FilterOptions};
pub use evaluation::{EvaluationSummary, EvaluationSummaryOptions};
pub use factory::{create, KINDS};
pub use files::{DeleteFile, DeleteFileOptions};
pub use load::{LoadDataset, LoadDatasetOptions};
pub use math::{substitute_placeholder, MathExpression, MathExpressionOptions, PLACEHOLDER};
pub use model::{CrossValidate, CrossValidateOptions, Train, TrainOptions};
pub use model_reader::ModelReader;
pub use passthrough::PassThrough;
pub use storage::{
    DeleteStorageValue, DeleteStorageValueOptions, InitStorageValue, InitStorageValueOptions, SetStorageValue,
    SetStorageValueOptions, UpdateStorageValue, UpdateStorageValueOptions,
};

use ml_flow_core::{Error, Result, Token};

/// Error for a payload the input check should have rejected
fn unexpected_payload(kind: &str, input: &Token) -> Error {
    Error::UnhandledClass(format!("{} cannot process {}", kind, input.payload().kind()))
}

/// Text payload of an input token
fn text_input<'a>(kind: &str, input: &'a Token) -> Result<&'a str> {
    input.payload().as_text().ok_or_else(|| unexpected_payload(kind, input))
}
