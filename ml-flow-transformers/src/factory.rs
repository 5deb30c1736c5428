//! Building actors by kind name from an option map

use ml_flow_core::options::check_known_options;
use ml_flow_core::{Actor, ComponentRegistry, Error, OptionHandler, Result, Transformer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::dataset::{ClassSelector, ClassSelectorOptions, Filter, FilterOptions};
use crate::evaluation::{EvaluationSummary, EvaluationSummaryOptions};
use crate::files::{DeleteFile, DeleteFileOptions};
use crate::load::{LoadDataset, LoadDatasetOptions};
use crate::math::{MathExpression, MathExpressionOptions};
use crate::model::{CrossValidate, CrossValidateOptions, Train, TrainOptions};
use crate::model_reader::ModelReader;
use crate::passthrough::PassThrough;
use crate::storage::{
    DeleteStorageValue, DeleteStorageValueOptions, InitStorageValue, InitStorageValueOptions, SetStorageValue,
    SetStorageValueOptions, UpdateStorageValue, UpdateStorageValueOptions,
};

/// Every kind [`create`] knows
pub const KINDS: &[&str] = &[
    PassThrough::KIND,
    LoadDataset::KIND,
    SetStorageValue::KIND,
    DeleteStorageValue::KIND,
    InitStorageValue::KIND,
    UpdateStorageValue::KIND,
    MathExpression::KIND,
    ClassSelector::KIND,
    Train::KIND,
    Filter::KIND,
    CrossValidate::KIND,
    EvaluationSummary::KIND,
    ModelReader::KIND,
    DeleteFile::KIND,
];

/// Create an actor of the given kind
///
/// `options` is a JSON map; absent options take their defaults and `null`
/// stands for an empty map. Component options (models, filters, loaders,
/// prediction outputs) are command lines built through `registry`, which
/// also supplies the serializer of `ModelReader`.
pub fn create(kind: &str, name: &str, options: &Value, registry: &ComponentRegistry) -> Result<Actor> {
    let empty = Value::Object(Map::new());
    let options = if options.is_null() { &empty } else { options };

    let transformer: Box<dyn Transformer> = match kind {
        PassThrough::KIND => {
            check_known_options(options, &[])?;
            Box::new(PassThrough::new())
        }
        LoadDataset::KIND => Box::new(LoadDataset::new(LoadDatasetOptions::from_options(options, registry)?)),
        SetStorageValue::KIND => Box::new(SetStorageValue::new(SetStorageValueOptions::from_options(
            options, registry,
        )?)),
        DeleteStorageValue::KIND => Box::new(DeleteStorageValue::new(DeleteStorageValueOptions::from_options(
            options, registry,
        )?)),
        InitStorageValue::KIND => Box::new(InitStorageValue::new(InitStorageValueOptions::from_options(
            options, registry,
        )?)),
        UpdateStorageValue::KIND => Box::new(UpdateStorageValue::new(UpdateStorageValueOptions::from_options(
            options, registry,
        )?)),
        MathExpression::KIND => Box::new(MathExpression::new(MathExpressionOptions::from_options(options, registry)?)),
        ClassSelector::KIND => Box::new(ClassSelector::new(ClassSelectorOptions::from_options(options, registry)?)),
        Train::KIND => Box::new(Train::new(TrainOptions::from_options(options, registry)?)),
        Filter::KIND => Box::new(Filter::new(FilterOptions::from_options(options, registry)?)),
        CrossValidate::KIND => Box::new(CrossValidate::new(CrossValidateOptions::from_options(options, registry)?)),
        EvaluationSummary::KIND => Box::new(EvaluationSummary::new(EvaluationSummaryOptions::from_options(
            options, registry,
        )?)),
        ModelReader::KIND => {
            check_known_options(options, &[])?;
            Box::new(ModelReader::new(registry.serializer()?))
        }
        DeleteFile::KIND => Box::new(DeleteFile::new(DeleteFileOptions::from_options(options, registry)?)),
        other => return Err(Error::Configuration(format!("unknown actor kind '{}'", other))),
    };

    debug!(kind, name, "created actor");
    Ok(Actor::new(name, transformer))
}
