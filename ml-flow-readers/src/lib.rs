//! File loaders for ML dataflow pipelines
//!
//! This crate provides the [`Loader`](ml_flow_core::source::Loader)
//! implementations used to turn files into datasets or row streams.

#![warn(missing_docs)]

mod error;
mod factory;

pub mod common;
pub mod csv;

pub use common::{FileFormat, ReaderOptions, SchemaInference};
pub use error::{Error, Result};
pub use factory::{loader_for_file, register_loaders};
