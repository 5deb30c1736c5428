//! Transformer trait: the behavior plugged into an actor

use std::fmt;

use serde_json::Value;

use crate::buffer::OutputQueue;
use crate::context::FlowContext;
use crate::error::{Error, Result};
use crate::options::OptionHelp;
use crate::token::{PayloadKind, Token};

/// Payload kinds an actor accepts as input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepts {
    /// Any payload
    Any,
    /// Only the listed kinds
    Only(&'static [PayloadKind]),
}

impl Accepts {
    /// Whether a payload kind is accepted
    pub fn allows(&self, kind: PayloadKind) -> bool {
        match self {
            Accepts::Any => true,
            Accepts::Only(kinds) => kinds.contains(&kind),
        }
    }
}

impl fmt::Display for Accepts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accepts::Any => f.write_str("any"),
            Accepts::Only(kinds) => {
                let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

/// The transformation performed by one actor kind
///
/// Implementations hold their typed options plus any private execution
/// state. The surrounding [`crate::actor::Actor`] drives the lifecycle and
/// guarantees that `check_input` passed before `do_execute` is called.
pub trait Transformer: Send + fmt::Debug {
    /// Kind name, e.g. `LoadDataset`
    fn kind(&self) -> &'static str;

    /// One-line description of what the actor does
    fn description(&self) -> &'static str;

    /// Short summary of the current configuration
    fn quickinfo(&self) -> Option<String> {
        None
    }

    /// Accepted input payload kinds
    fn accepts(&self) -> Accepts {
        Accepts::Any
    }

    /// Help for every option
    fn options_help(&self) -> &'static [OptionHelp];

    /// Current options as a JSON map
    fn to_options(&self) -> Result<Value>;

    /// Validate an input token
    fn check_input(&self, actor: &str, token: &Token) -> Result<()> {
        let found = token.payload().kind();
        if self.accepts().allows(found) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                actor: actor.to_string(),
                found,
            })
        }
    }

    /// Transform one input token, enqueueing any output
    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()>;

    /// Release execution state; must not fail
    fn stop_execution(&mut self) {}

    /// Release everything at the end of a run; must not fail
    fn wrapup(&mut self) {
        self.stop_execution();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(Accepts::Any.allows(PayloadKind::Null));
        let text_only = Accepts::Only(&[PayloadKind::Text]);
        assert!(text_only.allows(PayloadKind::Text));
        assert!(!text_only.allows(PayloadKind::Dataset));
        assert_eq!(text_only.to_string(), "Text");
    }
}
