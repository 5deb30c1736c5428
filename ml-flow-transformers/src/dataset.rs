//! Transformers operating on whole datasets

use std::sync::Arc;

use ml_flow_core::filter::{AllFilter, DatasetFilter};
use ml_flow_core::options::{from_option_map, option_str, resolve, to_option_map};
use ml_flow_core::{
    Accepts, ClassIndex, ComponentRegistry, Dataset, FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue,
    PayloadKind, Result, Schema, Token, Transformer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::unexpected_payload;

const DATASET_ONLY: Accepts = Accepts::Only(&[PayloadKind::Dataset]);

fn dataset_input<'a>(kind: &str, input: &'a Token) -> Result<&'a Arc<dyn Dataset>> {
    input.payload().as_dataset().ok_or_else(|| unexpected_payload(kind, input))
}

const CLASS_SELECTOR_HELP: &[OptionHelp] = &[
    OptionHelp::new(
        "index",
        "The class index (1-based number); 'first' and 'last' are accepted as well (string).",
    ),
    OptionHelp::new("unset", "Whether to unset the class index (bool)."),
];

/// Options of [`ClassSelector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassSelectorOptions {
    /// 1-based index, `first` or `last`
    pub index: OptionValue<String>,

    /// Remove the class attribute instead of setting it
    pub unset: OptionValue<bool>,
}

impl Default for ClassSelectorOptions {
    fn default() -> Self {
        Self {
            index: OptionValue::Value("last".to_string()),
            unset: OptionValue::Value(false),
        }
    }
}

primitive_options!(ClassSelectorOptions, CLASS_SELECTOR_HELP);

/// Sets or unsets the class attribute of a dataset
///
/// The incoming dataset is left untouched; a relabelled copy is forwarded.
#[derive(Debug, Clone, Default)]
pub struct ClassSelector {
    options: ClassSelectorOptions,
}

impl ClassSelector {
    /// Kind name
    pub const KIND: &'static str = "ClassSelector";

    /// Create the transformer
    pub fn new(options: ClassSelectorOptions) -> Self {
        Self { options }
    }
}

impl Transformer for ClassSelector {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Sets/unsets the class index of a dataset."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("index: {}", self.options.index))
    }

    fn accepts(&self) -> Accepts {
        DATASET_ONLY
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        ClassSelectorOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let data = dataset_input(Self::KIND, input)?;
        let class_index = if resolve(ctx, "unset", &self.options.unset)? {
            ClassIndex::Unset
        } else {
            ClassIndex::parse(&resolve(ctx, "index", &self.options.index)?)?
        };

        output.push(Token::new(data.with_class_index(class_index)?));
        Ok(())
    }
}

const FILTER_HELP: &[OptionHelp] = &[OptionHelp::new("filter", "The filter to apply to the dataset (Filter).")];

/// Options of [`Filter`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Filter template, copied before fitting
    #[serde(skip)]
    pub filter: Box<dyn DatasetFilter>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            filter: Box::new(AllFilter::new()),
        }
    }
}

impl OptionHandler for FilterOptions {
    fn help() -> &'static [OptionHelp] {
        FILTER_HELP
    }

    fn to_options(&self) -> Result<Value> {
        let mut map = to_option_map(self)?;
        map.insert("filter".into(), Value::String(self.filter.commandline()));
        Ok(Value::Object(map))
    }

    fn from_options(options: &Value, registry: &ComponentRegistry) -> Result<Self> {
        let mut record: Self = from_option_map(options, FILTER_HELP)?;
        if let Some(commandline) = option_str(options, "filter")? {
            record.filter = registry.filter(commandline)?;
        }
        Ok(record)
    }
}

/// Filters datasets, refitting only when the dataset header changes
#[derive(Debug, Default)]
pub struct Filter {
    options: FilterOptions,

    /// Fitted copy of the template and the header it was fitted on
    fitted: Option<(Arc<Schema>, Box<dyn DatasetFilter>)>,
}

impl Filter {
    /// Kind name
    pub const KIND: &'static str = "Filter";

    /// Create the transformer
    pub fn new(options: FilterOptions) -> Self {
        Self { options, fitted: None }
    }
}

impl Transformer for Filter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Filters a dataset with the specified filter setup.\nAutomatically resets the filter if the dataset differs."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("filter: {}", self.options.filter.commandline()))
    }

    fn accepts(&self) -> Accepts {
        DATASET_ONLY
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        FilterOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, _ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let data = dataset_input(Self::KIND, input)?;
        let header = data.header();

        let fitted = match self.fitted.take() {
            Some((cached, filter)) if cached.equal_headers(&header).is_none() => (cached, filter),
            _ => {
                let mut filter = self.options.filter.copy();
                filter.set_input_format(&header)?;
                debug!(filter = %filter.commandline(), relation = header.relation(), "fitted filter");
                (header, filter)
            }
        };

        let (_, filter) = self.fitted.insert(fitted);
        output.push(Token::new(filter.filter(data.as_ref())?));
        Ok(())
    }

    fn stop_execution(&mut self) {
        self.fitted = None;
    }
}
