//! Linear sequence execution
//!
//! A [`Sequence`] drives a chain of actors depth-first: every token an actor
//! produces is pushed through the rest of the chain before the actor is asked
//! for its next token, so incremental sources never buffer their whole output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::actor::Actor;
use crate::context::FlowContext;
use crate::error::{Error, Result};
use crate::token::Token;

/// Configuration for a sequence
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Abort the run on the first failing actor step
    pub stop_on_error: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { stop_on_error: true }
    }
}

/// Statistics from one run
#[derive(Debug, Clone, Default)]
pub struct SequenceStats {
    /// Tokens fed into the first actor
    pub tokens_in: u64,

    /// Tokens produced by the last actor
    pub tokens_out: u64,

    /// Failed actor steps that were skipped
    pub failures: u64,

    /// Whether the run ended because of a stop request
    pub stopped: bool,

    /// Total execution time
    pub execution_time: Duration,
}

/// Result of one run
#[derive(Debug)]
pub struct SequenceOutput {
    /// Tokens produced by the last actor, in order
    pub tokens: Vec<Token>,

    /// Run statistics
    pub stats: SequenceStats,
}

/// A named chain of actors
#[derive(Debug)]
pub struct Sequence {
    /// Name of the flow
    name: String,

    /// The actors, upstream first
    actors: Vec<Actor>,

    /// Configuration for this sequence
    config: SequenceConfig,

    /// Set by [`Sequence::stop`] or a stop handle
    stopped: Arc<AtomicBool>,
}

impl Sequence {
    /// Create a sequence; each actor's full name is prefixed with `name`
    pub fn new(name: impl Into<String>, mut actors: Vec<Actor>, config: SequenceConfig) -> Self {
        let name = name.into();
        for actor in &mut actors {
            actor.set_parent(name.clone());
        }
        Self {
            name,
            actors,
            config,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Name of the flow
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actors, upstream first
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Mutable access to the actors
    pub fn actors_mut(&mut self) -> &mut [Actor] {
        &mut self.actors
    }

    /// Flag that stops the run when set, usable from another thread
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    /// Push every input token through the chain, then wrap up all actors
    pub fn run<I>(&mut self, ctx: &mut FlowContext, inputs: I) -> Result<SequenceOutput>
    where
        I: IntoIterator<Item = Token>,
    {
        let start = Instant::now();
        let mut stats = SequenceStats::default();
        let mut tokens = Vec::new();

        info!(flow = %self.name, run_id = %ctx.run_id(), actors = self.actors.len(), "starting sequence");

        let mut result = Ok(());
        for token in inputs {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            stats.tokens_in += 1;
            result = process(
                &mut self.actors,
                token,
                ctx,
                &self.config,
                &self.stopped,
                &mut stats,
                &mut tokens,
            );
            if result.is_err() {
                break;
            }
        }

        stats.stopped = self.stopped.load(Ordering::SeqCst);
        if stats.stopped {
            for actor in &mut self.actors {
                actor.stop_execution();
            }
        }
        for actor in &mut self.actors {
            actor.wrapup();
        }

        stats.tokens_out = tokens.len() as u64;
        stats.execution_time = start.elapsed();
        info!(
            flow = %self.name,
            run_id = %ctx.run_id(),
            tokens_in = stats.tokens_in,
            tokens_out = stats.tokens_out,
            failures = stats.failures,
            stopped = stats.stopped,
            "sequence finished"
        );

        result.map(|()| SequenceOutput { tokens, stats })
    }

    /// Stop every actor; takes effect at the next token boundary
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        for actor in &mut self.actors {
            actor.stop_execution();
        }
    }
}

fn handle_failure(actor: &Actor, error: Error, config: &SequenceConfig, stats: &mut SequenceStats) -> Result<()> {
    if config.stop_on_error {
        return Err(error);
    }
    warn!(actor = %actor.full_name(), error = %error, "skipping failed step");
    stats.failures += 1;
    Ok(())
}

fn process(
    actors: &mut [Actor],
    token: Token,
    ctx: &mut FlowContext,
    config: &SequenceConfig,
    stopped: &AtomicBool,
    stats: &mut SequenceStats,
    sink: &mut Vec<Token>,
) -> Result<()> {
    let Some((first, rest)) = actors.split_first_mut() else {
        sink.push(token);
        return Ok(());
    };

    let step = first.input(token).and_then(|()| first.execute(ctx));

    // partial output of a failed step is forwarded too
    while !stopped.load(Ordering::SeqCst) && first.has_output() {
        let Some(next) = first.output() else {
            break;
        };
        process(rest, next, ctx, config, stopped, stats, sink)?;
    }

    if let Err(e) = step {
        handle_failure(first, e, config, stats)?;
    }
    if let Some(e) = first.take_output_error() {
        handle_failure(first, e, config, stats)?;
    }

    Ok(())
}
