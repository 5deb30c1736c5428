//! Actor: the lifecycle state machine wrapped around a transformer
//!
//! ```text
//! Idle -> CheckingInput -> Executing -> ProducingOutput -> Idle
//!              |               |
//!              +---> Error <---+          any state -> Stopped
//! ```

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::buffer::OutputQueue;
use crate::context::FlowContext;
use crate::error::{Error, Result};
use crate::options::OptionHelp;
use crate::token::Token;
use crate::transform::Transformer;

/// Lifecycle state of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// Waiting for input
    Idle,
    /// Validating an input token
    CheckingInput,
    /// Running the transformation
    Executing,
    /// Output is being drained
    ProducingOutput,
    /// Terminal; no more work is accepted
    Stopped,
    /// The last check or execution failed; the actor stays usable
    Error,
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorState::Idle => "idle",
            ActorState::CheckingInput => "checking-input",
            ActorState::Executing => "executing",
            ActorState::ProducingOutput => "producing-output",
            ActorState::Stopped => "stopped",
            ActorState::Error => "error",
        };
        f.write_str(name)
    }
}

/// A named pipeline stage
#[derive(Debug)]
pub struct Actor {
    /// Name of this actor
    name: String,

    /// Name of the enclosing flow, if any
    parent: Option<String>,

    /// The transformation performed
    transformer: Box<dyn Transformer>,

    /// Current lifecycle state
    state: ActorState,

    /// Pending input token, cleared after a successful execution
    input: Option<Token>,

    /// Produced tokens not yet handed out
    output: OutputQueue,
}

impl Actor {
    /// Create an actor around a transformer
    pub fn new(name: impl Into<String>, transformer: Box<dyn Transformer>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            transformer,
            state: ActorState::Idle,
            input: None,
            output: OutputQueue::new(),
        }
    }

    /// Name of this actor
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name of the enclosing flow
    pub fn set_parent(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    /// Name qualified with the enclosing flow, used in messages
    pub fn full_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ActorState {
        self.state
    }

    /// Kind of the wrapped transformer
    pub fn kind(&self) -> &'static str {
        self.transformer.kind()
    }

    /// Description of the wrapped transformer
    pub fn description(&self) -> &'static str {
        self.transformer.description()
    }

    /// Short summary of the configuration
    pub fn quickinfo(&self) -> Option<String> {
        self.transformer.quickinfo()
    }

    /// Current options as a JSON map
    pub fn options(&self) -> Result<Value> {
        self.transformer.to_options()
    }

    /// Help for every option
    pub fn options_help(&self) -> &'static [OptionHelp] {
        self.transformer.options_help()
    }

    /// The wrapped transformer
    pub fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }

    /// Whether an input token is pending
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Hand a token to the actor; rejected tokens are not stored
    pub fn input(&mut self, token: Token) -> Result<()> {
        let actor = self.full_name();
        if self.state == ActorState::Stopped {
            return Err(Error::Stopped { actor });
        }

        self.state = ActorState::CheckingInput;
        match self.transformer.check_input(&actor, &token) {
            Ok(()) => {
                debug!(actor = %actor, kind = %token.payload().kind(), "input accepted");
                self.input = Some(token);
                self.state = ActorState::Idle;
                Ok(())
            }
            Err(e) => {
                debug!(actor = %actor, error = %e, "input rejected");
                self.state = ActorState::Error;
                Err(e)
            }
        }
    }

    /// Execute the pending input token
    ///
    /// Output enqueued before a failure is kept. On failure the input stays
    /// pending; a new [`Actor::input`] replaces it.
    pub fn execute(&mut self, ctx: &mut FlowContext) -> Result<()> {
        let actor = self.full_name();
        if self.state == ActorState::Stopped {
            return Err(Error::Stopped { actor });
        }

        let Some(token) = self.input.as_ref() else {
            self.state = ActorState::Error;
            return Err(Error::NoInput { actor });
        };

        self.state = ActorState::CheckingInput;
        if let Err(e) = self.transformer.check_input(&actor, token) {
            self.state = ActorState::Error;
            self.input = None;
            return Err(e);
        }

        self.state = ActorState::Executing;
        debug!(actor = %actor, run_id = %ctx.run_id(), "executing");
        match self.transformer.do_execute(token, ctx, &mut self.output) {
            Ok(()) => {
                self.post_execute();
                debug!(actor = %actor, buffered = self.output.buffered(), "executed");
                Ok(())
            }
            Err(e) => {
                warn!(actor = %actor, error = %e, "execution failed");
                self.state = ActorState::Error;
                Err(e)
            }
        }
    }

    fn post_execute(&mut self) {
        self.input = None;
        self.state = ActorState::ProducingOutput;
    }

    /// Whether another output token is available
    pub fn has_output(&mut self) -> bool {
        let available = self.output.has_output();
        if !available && self.state == ActorState::ProducingOutput {
            self.state = ActorState::Idle;
        }
        available
    }

    /// Next output token, if any
    pub fn output(&mut self) -> Option<Token> {
        let token = self.output.pop();
        if token.is_none() && self.state == ActorState::ProducingOutput {
            self.state = ActorState::Idle;
        }
        token
    }

    /// Error that ended an incremental output sequence, if any
    pub fn take_output_error(&mut self) -> Option<Error> {
        self.output.take_error()
    }

    /// Stop the actor; terminal and idempotent
    pub fn stop_execution(&mut self) {
        if self.state == ActorState::Stopped {
            return;
        }
        self.transformer.stop_execution();
        self.output.clear();
        self.input = None;
        self.state = ActorState::Stopped;
        debug!(actor = %self.full_name(), "stopped");
    }

    /// Release resources at the end of a run; idempotent
    pub fn wrapup(&mut self) {
        self.transformer.wrapup();
        self.output.clear();
        self.input = None;
        if self.state != ActorState::Stopped {
            self.state = ActorState::Idle;
        }
    }

    /// Whether [`Actor::stop_execution`] was called
    pub fn is_stopped(&self) -> bool {
        self.state == ActorState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TokenSequence;
    use crate::transform::Accepts;
    use crate::token::PayloadKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Repeats the text input `count` times, optionally failing afterwards
    #[derive(Debug)]
    struct Repeat {
        count: i64,
        fail_after_output: bool,
        lazy: bool,
        broken_last_row: bool,
        executions: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl Repeat {
        fn new(count: i64) -> Self {
            Self {
                count,
                fail_after_output: false,
                lazy: false,
                broken_last_row: false,
                executions: Arc::new(AtomicUsize::new(0)),
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Transformer for Repeat {
        fn kind(&self) -> &'static str {
            "Repeat"
        }

        fn description(&self) -> &'static str {
            "Repeats text"
        }

        fn accepts(&self) -> Accepts {
            Accepts::Only(&[PayloadKind::Text])
        }

        fn options_help(&self) -> &'static [OptionHelp] {
            &[]
        }

        fn to_options(&self) -> Result<Value> {
            Ok(serde_json::json!({}))
        }

        fn do_execute(&mut self, input: &Token, _ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if self.lazy {
                let text = input.payload().to_string();
                let mut rows: Vec<Result<Token>> =
                    (0..self.count).map(|i| Ok(Token::new(format!("{}{}", text, i)))).collect();
                if self.broken_last_row {
                    rows.push(Err(Error::Dataset("broken row".into())));
                }
                output.set_sequence(TokenSequence::from_items(rows));
            } else {
                for _ in 0..self.count {
                    output.push(input.clone());
                }
            }
            if self.fail_after_output {
                return Err(Error::Execution("boom".into()));
            }
            Ok(())
        }

        fn stop_execution(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_lifecycle_states() {
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("repeat", Box::new(Repeat::new(2)));
        assert_eq!(actor.state(), ActorState::Idle);

        actor.input(Token::new("a")).unwrap();
        assert!(actor.has_input());
        actor.execute(&mut ctx).unwrap();
        assert!(!actor.has_input());
        assert_eq!(actor.state(), ActorState::ProducingOutput);

        assert!(actor.output().is_some());
        assert!(actor.output().is_some());
        assert!(!actor.has_output());
        assert_eq!(actor.state(), ActorState::Idle);
    }

    #[test]
    fn test_rejected_input_has_no_side_effects() {
        let mut ctx = FlowContext::new();
        let transformer = Repeat::new(1);
        let executions = transformer.executions.clone();
        let mut actor = Actor::new("repeat", Box::new(transformer));
        actor.set_parent("flow");

        let err = actor.input(Token::new(3_i64)).unwrap_err();
        assert_eq!(err.to_string(), "flow.repeat: Unhandled class: Integer");
        assert_eq!(actor.state(), ActorState::Error);
        assert!(!actor.has_input());

        assert!(matches!(actor.execute(&mut ctx), Err(Error::NoInput { .. })));
        assert_eq!(executions.load(Ordering::SeqCst), 0);
        assert!(!actor.has_output());
    }

    #[test]
    fn test_failure_keeps_partial_output() {
        let mut ctx = FlowContext::new();
        let mut transformer = Repeat::new(2);
        transformer.fail_after_output = true;
        let mut actor = Actor::new("repeat", Box::new(transformer));

        actor.input(Token::new("x")).unwrap();
        assert!(actor.execute(&mut ctx).is_err());
        assert_eq!(actor.state(), ActorState::Error);
        assert!(actor.has_input());
        assert!(actor.output().is_some());
        assert!(actor.output().is_some());
        assert!(actor.output().is_none());

        actor.input(Token::new("y")).unwrap();
        assert_eq!(actor.state(), ActorState::Idle);
    }

    #[test]
    fn test_stop_is_terminal_and_idempotent() {
        let mut ctx = FlowContext::new();
        let mut transformer = Repeat::new(1_000);
        transformer.lazy = true;
        let stops = transformer.stops.clone();
        let mut actor = Actor::new("repeat", Box::new(transformer));

        actor.input(Token::new("row")).unwrap();
        actor.execute(&mut ctx).unwrap();
        assert_eq!(actor.output().unwrap().payload().as_text(), Some("row0"));

        actor.stop_execution();
        actor.stop_execution();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!actor.has_output());
        assert!(actor.is_stopped());
        assert!(matches!(actor.input(Token::new("z")), Err(Error::Stopped { .. })));
        assert!(matches!(actor.execute(&mut ctx), Err(Error::Stopped { .. })));
    }

    #[test]
    fn test_wrapup_forgets_sequence_error() {
        let mut ctx = FlowContext::new();
        let mut transformer = Repeat::new(1);
        transformer.lazy = true;
        transformer.broken_last_row = true;
        let mut actor = Actor::new("repeat", Box::new(transformer));

        actor.input(Token::new("row")).unwrap();
        actor.execute(&mut ctx).unwrap();
        assert!(actor.output().is_some());
        assert!(!actor.has_output());

        actor.wrapup();
        assert!(actor.take_output_error().is_none());
    }

    #[test]
    fn test_wrapup_without_execution() {
        let mut actor = Actor::new("repeat", Box::new(Repeat::new(1)));
        actor.wrapup();
        actor.wrapup();
        assert_eq!(actor.state(), ActorState::Idle);
    }
}
