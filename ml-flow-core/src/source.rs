//! Loader capability: turning files into datasets or row streams

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::dataset::{Dataset, Instance};
use crate::error::Result;
use crate::model::to_commandline;
use crate::schema::Schema;

/// Lazy stream of rows; finite if the source is finite, not restartable
pub type RowStream = Box<dyn Iterator<Item = Result<Instance>> + Send>;

/// What a loader produced
pub enum Loaded {
    /// The whole dataset at once
    Batch(Arc<dyn Dataset>),

    /// Header plus a lazy row stream
    Incremental {
        /// Header of the rows to come
        header: Arc<Schema>,
        /// The rows
        rows: RowStream,
    },
}

impl fmt::Debug for Loaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loaded::Batch(data) => f.debug_tuple("Batch").field(data).finish(),
            Loaded::Incremental { header, .. } => f
                .debug_struct("Incremental")
                .field("header", &header.relation())
                .finish_non_exhaustive(),
        }
    }
}

/// A loader for one file format
pub trait Loader: Send + Sync + fmt::Debug {
    /// Name of the loader
    fn classname(&self) -> &str;

    /// Loader options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Fresh copy carrying the same configuration
    fn copy(&self) -> Box<dyn Loader>;

    /// Load a file, either whole or as a lazy row stream
    fn load(&self, path: &Path, incremental: bool) -> Result<Loaded>;

    /// Loader name followed by its options
    fn commandline(&self) -> String {
        to_commandline(self.classname(), &self.options())
    }
}
