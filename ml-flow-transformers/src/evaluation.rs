//! Textual summaries of evaluation results

use ml_flow_core::options::{resolve, resolve_optional};
use ml_flow_core::{
    Accepts, FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue, PayloadKind, Result, Token, Transformer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::unexpected_payload;

const HELP: &[OptionHelp] = &[
    OptionHelp::new("title", "The title for the output (string)."),
    OptionHelp::new("complexity", "Whether to output complexity information (bool)."),
    OptionHelp::new("matrix", "Whether to output the confusion matrix (bool)."),
];

/// Options of [`EvaluationSummary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSummaryOptions {
    /// Title of the summary
    pub title: Option<OptionValue<String>>,

    /// Include complexity statistics
    pub complexity: OptionValue<bool>,

    /// Append the confusion matrix
    pub matrix: OptionValue<bool>,
}

impl Default for EvaluationSummaryOptions {
    fn default() -> Self {
        Self {
            title: None,
            complexity: OptionValue::Value(false),
            matrix: OptionValue::Value(false),
        }
    }
}

primitive_options!(EvaluationSummaryOptions, HELP);

/// Turns an evaluation into its summary text
#[derive(Debug, Clone, Default)]
pub struct EvaluationSummary {
    options: EvaluationSummaryOptions,
}

impl EvaluationSummary {
    /// Kind name
    pub const KIND: &'static str = "EvaluationSummary";

    /// Create the transformer
    pub fn new(options: EvaluationSummaryOptions) -> Self {
        Self { options }
    }
}

impl Transformer for EvaluationSummary {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Generates a summary string from an Evaluation object."
    }

    fn quickinfo(&self) -> Option<String> {
        let title = self
            .options
            .title
            .as_ref()
            .map_or_else(|| "None".to_string(), ToString::to_string);
        Some(format!(
            "title: {}, complexity: {}, matrix: {}",
            title, self.options.complexity, self.options.matrix
        ))
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Evaluation])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        EvaluationSummaryOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let evaluation = input
            .payload()
            .as_evaluation()
            .ok_or_else(|| unexpected_payload(Self::KIND, input))?;
        let title = resolve_optional(ctx, "title", self.options.title.as_ref())?;

        let mut summary = evaluation.summary(title.as_deref(), resolve(ctx, "complexity", &self.options.complexity)?);
        if resolve(ctx, "matrix", &self.options.matrix)? {
            summary.push('\n');
            summary.push_str(&evaluation.matrix(title.as_deref())?);
        }

        output.push(Token::new(summary));
        Ok(())
    }
}
