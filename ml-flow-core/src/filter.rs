//! Dataset filter capability

use std::fmt;
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::model::to_commandline;
use crate::schema::{ClassIndex, Schema};

/// A filter that transforms whole datasets
///
/// A filter must be told the input format before it is used. Fitting happens
/// in [`DatasetFilter::set_input_format`]; [`DatasetFilter::filter`] then
/// applies the fitted state to any dataset with that format.
pub trait DatasetFilter: Send + Sync + fmt::Debug {
    /// Name of the filter scheme
    fn classname(&self) -> &str;

    /// Scheme options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Unfitted copy carrying the same configuration
    fn copy(&self) -> Box<dyn DatasetFilter>;

    /// Fit the filter to the given input format
    fn set_input_format(&mut self, header: &Schema) -> Result<()>;

    /// Apply the fitted filter
    fn filter(&mut self, data: &dyn Dataset) -> Result<Arc<dyn Dataset>>;

    /// Scheme name followed by its options
    fn commandline(&self) -> String {
        to_commandline(self.classname(), &self.options())
    }
}

/// Identity filter: forwards datasets unchanged
#[derive(Debug, Clone, Default)]
pub struct AllFilter {
    input_format: Option<Schema>,
}

impl AllFilter {
    /// Name under which the identity filter is registered
    pub const CLASSNAME: &'static str = "AllFilter";

    /// Create a new identity filter
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetFilter for AllFilter {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn DatasetFilter> {
        Box::new(AllFilter::new())
    }

    fn set_input_format(&mut self, header: &Schema) -> Result<()> {
        self.input_format = Some(header.clone());
        Ok(())
    }

    fn filter(&mut self, data: &dyn Dataset) -> Result<Arc<dyn Dataset>> {
        let format = self
            .input_format
            .as_ref()
            .ok_or_else(|| Error::Dataset("No input format defined!".into()))?;
        if let Some(reason) = format.equal_headers(&data.header()) {
            return Err(Error::SchemaMismatch(reason));
        }
        // Identity: rebuild a shared handle with the same class attribute
        let class_index = match data.header().class_index() {
            Some(index) => ClassIndex::At(index),
            None => ClassIndex::Unset,
        };
        data.with_class_index(class_index)
    }
}
