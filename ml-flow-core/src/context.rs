//! Per-run flow context handed to every actor execution

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::{contains_variable, Storage};

/// State shared by all actors of one flow run
///
/// The context is owned by whoever drives the run and passed by mutable
/// reference into each actor step; it is never global, so independent runs
/// each own their own instance.
#[derive(Debug)]
pub struct FlowContext {
    run_id: Uuid,
    storage: Option<Storage>,
}

impl FlowContext {
    /// Create a context with an empty storage
    pub fn new() -> Self {
        Self::with_storage(Storage::new())
    }

    /// Create a context around an existing storage
    pub fn with_storage(storage: Storage) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            storage: Some(storage),
        }
    }

    /// Create a context without any storage handler
    pub fn without_storage() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            storage: None,
        }
    }

    /// Identifier of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Whether a storage handler is attached
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// The storage, or [`Error::NoStorageHandler`]
    pub fn storage(&self) -> Result<&Storage> {
        self.storage.as_ref().ok_or(Error::NoStorageHandler)
    }

    /// The storage for mutation, or [`Error::NoStorageHandler`]
    pub fn storage_mut(&mut self) -> Result<&mut Storage> {
        self.storage.as_mut().ok_or(Error::NoStorageHandler)
    }

    /// Detach and return the storage, ending its lifetime for this run
    pub fn take_storage(&mut self) -> Option<Storage> {
        self.storage.take()
    }

    /// Expand variable references; text without references needs no storage
    pub fn expand(&self, text: &str) -> Result<String> {
        if !contains_variable(text) {
            return Ok(text.to_string());
        }
        self.storage()?.expand(text)
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_storage_is_reported() {
        let mut ctx = FlowContext::without_storage();
        assert!(matches!(ctx.storage_mut(), Err(Error::NoStorageHandler)));
        assert_eq!(ctx.expand("plain").unwrap(), "plain");
        assert!(matches!(ctx.expand("@{x}"), Err(Error::NoStorageHandler)));
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        assert_ne!(FlowContext::new().run_id(), FlowContext::new().run_id());
    }
}
