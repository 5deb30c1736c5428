//! Choosing and registering loaders

use std::path::Path;

use ml_flow_core::source::Loader;
use ml_flow_core::ComponentRegistry;
use tracing::debug;

use crate::common::FileFormat;
use crate::csv::{CsvLoader, CsvLoaderOptions};
use crate::error::{Error, Result};

/// Pick a loader from the file extension
pub fn loader_for_file(path: &Path) -> Result<Box<dyn Loader>> {
    let format = FileFormat::detect_from_path(path)
        .ok_or_else(|| Error::Unsupported(format!("no loader for file: {}", path.display())))?;
    debug!(path = %path.display(), ?format, "selected loader");

    let options = CsvLoaderOptions {
        delimiter: format.delimiter(),
        ..CsvLoaderOptions::default()
    };
    Ok(Box::new(CsvLoader::new(options)))
}

/// Make every loader of this crate available to option deserialization
pub fn register_loaders(registry: &mut ComponentRegistry) {
    registry.register_loader(CsvLoader::CLASSNAME, |args| Ok(Box::new(CsvLoader::from_args(args)?)));
}
