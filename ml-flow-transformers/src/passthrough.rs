//! Identity transformer

use ml_flow_core::{FlowContext, OptionHelp, OutputQueue, Result, Token, Transformer};
use serde_json::{Map, Value};

/// Forwards every input token unchanged
#[derive(Debug, Clone, Default)]
pub struct PassThrough;

impl PassThrough {
    /// Kind name
    pub const KIND: &'static str = "PassThrough";

    /// Create the transformer
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for PassThrough {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Dummy actor that just passes through the data."
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        &[]
    }

    fn to_options(&self) -> Result<Value> {
        Ok(Value::Object(Map::new()))
    }

    fn do_execute(&mut self, input: &Token, _ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        output.push(input.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::Actor;

    #[test]
    fn test_forwards_any_payload() {
        let mut ctx = FlowContext::without_storage();
        let mut actor = Actor::new("pass", Box::new(PassThrough::new()));

        for token in [Token::new(1_i64), Token::new("text"), Token::new(false)] {
            actor.input(token.clone()).unwrap();
            actor.execute(&mut ctx).unwrap();
            let out = actor.output().unwrap();
            assert_eq!(out.payload().kind(), token.payload().kind());
            assert!(!actor.has_output());
        }
    }
}
