//! Arithmetic on token payloads

use ml_flow_core::expression;
use ml_flow_core::options::resolve;
use ml_flow_core::{
    FlowContext, OptionHandler, OptionHelp, OptionValue, OutputQueue, Payload, Result, Token, Transformer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Placeholder replaced with the current value before an expression is evaluated
pub const PLACEHOLDER: &str = "{X}";

/// Replace every [`PLACEHOLDER`] with the stringified value
pub fn substitute_placeholder(expression: &str, value: &Payload) -> String {
    expression.replace(PLACEHOLDER, &value.to_string())
}

const HELP: &[OptionHelp] = &[OptionHelp::new(
    "expression",
    "The mathematical expression to evaluate (string).",
)];

/// Options of [`MathExpression`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathExpressionOptions {
    /// Expression; `{X}` stands for the input payload
    pub expression: OptionValue<String>,
}

impl Default for MathExpressionOptions {
    fn default() -> Self {
        Self {
            expression: OptionValue::Value(PLACEHOLDER.to_string()),
        }
    }
}

primitive_options!(MathExpressionOptions, HELP);

/// Evaluates an expression over the input payload and forwards the result as a number
#[derive(Debug, Clone, Default)]
pub struct MathExpression {
    options: MathExpressionOptions,
}

impl MathExpression {
    /// Kind name
    pub const KIND: &'static str = "MathExpression";

    /// Create the transformer
    pub fn new(options: MathExpressionOptions) -> Self {
        Self { options }
    }

    /// The options
    pub fn options(&self) -> &MathExpressionOptions {
        &self.options
    }
}

impl Transformer for MathExpression {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Calculates a mathematical expression. The placeholder {X} in the expression gets replaced by \
         the value of the current input token, e.g. '1 + sin({X})'."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("expression: {}", self.options.expression))
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        MathExpressionOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let template = resolve(ctx, "expression", &self.options.expression)?;
        let expr = substitute_placeholder(&template, input.payload());
        let result = expression::evaluate(&expr)?;
        trace!(expression = %expr, result = %result, "evaluated");
        output.push(Token::new(result.as_f64()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::{Actor, Error};
    use proptest::prelude::*;
    use test_case::test_case;

    fn run(expression: &str, input: Token) -> Result<Payload> {
        let mut ctx = FlowContext::new();
        ctx.storage_mut()?.set("offset", 10_i64);
        let mut actor = Actor::new(
            "math",
            Box::new(MathExpression::new(MathExpressionOptions {
                expression: OptionValue::text(expression),
            })),
        );
        actor.input(input)?;
        actor.execute(&mut ctx)?;
        Ok(actor.output().map(Token::into_payload).unwrap_or(Payload::Null))
    }

    #[test_case("1 + {X}", Token::new(4_i64), 5.0 ; "integer input")]
    #[test_case("{X} / 2", Token::new(5_i64), 2.5 ; "true division")]
    #[test_case("{X} * {X}", Token::new(1.5), 2.25 ; "placeholder used twice")]
    #[test_case("{X} + @{offset}", Token::new("2"), 12.0 ; "text input and variable")]
    #[test_case("{X}", Token::new(7_i64), 7.0 ; "default expression")]
    fn test_evaluates(expression: &str, input: Token, expected: f64) {
        let payload = run(expression, input).unwrap();
        assert!(matches!(payload, Payload::Number(v) if (v - expected).abs() < 1e-12));
    }

    #[test]
    fn test_substitution_formats_like_the_payload() {
        assert_eq!(substitute_placeholder("int({X} + 1)", &Payload::Integer(3)), "int(3 + 1)");
        assert_eq!(substitute_placeholder("{X}", &Payload::Number(2.0)), "2.0");
    }

    #[test]
    fn test_failures() {
        assert!(matches!(run("{X} +", Token::new(1_i64)), Err(Error::Expression(_))));
        assert!(matches!(run("{X} + @{missing}", Token::new(1_i64)), Err(Error::UnknownVariable(_))));
    }

    #[test]
    fn test_quickinfo() {
        assert_eq!(MathExpression::default().quickinfo().unwrap(), "expression: {X}");
    }

    proptest! {
        #[test]
        fn prop_integer_payloads_substitute_exactly(x in -1_000_000_i64..1_000_000) {
            let payload = run("{X} - 1", Token::new(x)).unwrap();
            let expected = format!("{}.0", x - 1);
            prop_assert_eq!(payload.to_string(), expected);
        }
    }
}
