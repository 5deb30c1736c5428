//! Core of the ML dataflow engine
//!
//! Tokens flow through actors. Each [`Actor`] wraps a [`Transformer`], checks
//! its input, executes, and hands out zero or more output tokens, possibly
//! from a lazy [`TokenSequence`]. A per-run [`FlowContext`] carries the shared
//! [`Storage`] that option values reference with `@{name}`.
//!
//! Learning schemes, filters, evaluations, loaders and serializers are
//! external capabilities reached through the traits in [`model`], [`filter`],
//! [`source`] and [`serialization`].

#![warn(missing_docs)]

pub mod actor;
pub mod buffer;
pub mod container;
pub mod context;
pub mod dataset;
pub mod error;
pub mod expression;
pub mod filter;
pub mod model;
pub mod options;
pub mod registry;
pub mod schedule;
pub mod schema;
pub mod serialization;
pub mod source;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod transform;

// Re-export key types for convenience
pub use actor::{Actor, ActorState};
pub use buffer::{OutputQueue, TokenSequence};
pub use container::ModelContainer;
pub use context::FlowContext;
pub use dataset::{Dataset, InMemoryDataset, Instance, Value};
pub use error::{Error, Result};
pub use model::{Model, ModelKind};
pub use options::{OptionHandler, OptionHelp, OptionValue};
pub use registry::ComponentRegistry;
pub use schema::{ClassIndex, DataType, Field, Schema};
pub use storage::Storage;
pub use token::{Payload, PayloadKind, Token};
pub use transform::{Accepts, Transformer};

/// Linear flow configuration and execution
pub mod flow {
    pub use crate::schedule::Sequence;
    pub use crate::schedule::SequenceConfig;
    pub use crate::schedule::SequenceOutput;
    pub use crate::schedule::SequenceStats;
}
