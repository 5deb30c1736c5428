//! Per-run key/value storage shared by all actors of a flow

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::token::Payload;

/// Opening sequence of a variable reference, e.g. `@{name}`
pub const VARIABLE_START: &str = "@{";

/// Closing character of a variable reference
pub const VARIABLE_END: char = '}';

const MAX_EXPANSION_DEPTH: usize = 32;

/// Check whether text contains at least one variable reference
pub fn contains_variable(text: &str) -> bool {
    text.contains(VARIABLE_START)
}

/// Check whether a string is a valid variable name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

/// Key/value store living for the duration of one flow run
#[derive(Debug, Clone, Default)]
pub struct Storage {
    values: HashMap<String, Payload>,
}

impl Storage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value
    pub fn get(&self, name: &str) -> Option<&Payload> {
        self.values.get(name)
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Payload>) -> Option<Payload> {
        let name = name.into();
        let value = value.into();
        trace!(name = %name, kind = %value.kind(), "storage set");
        self.values.insert(name, value)
    }

    /// Remove a value; removing an absent name is a no-op
    pub fn delete(&mut self, name: &str) -> Option<Payload> {
        trace!(name = %name, "storage delete");
        self.values.remove(name)
    }

    /// Check whether a value is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the storage is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Replace every `@{name}` reference with the stringified storage value.
    ///
    /// Substituted text is expanded again until no reference remains.
    pub fn expand(&self, text: &str) -> Result<String> {
        let mut current = text.to_string();

        for _ in 0..MAX_EXPANSION_DEPTH {
            if !contains_variable(&current) {
                return Ok(current);
            }
            current = self.expand_once(&current)?;
        }

        Err(Error::Configuration(format!(
            "Variable expansion of '{}' did not terminate",
            text
        )))
    }

    fn expand_once(&self, text: &str) -> Result<String> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(VARIABLE_START) {
            result.push_str(&rest[..start]);
            let after = &rest[start + VARIABLE_START.len()..];
            let end = after.find(VARIABLE_END).ok_or_else(|| {
                Error::Configuration(format!("Unclosed variable reference in '{}'", text))
            })?;

            let name = &after[..end];
            if !is_valid_name(name) {
                return Err(Error::Configuration(format!(
                    "Invalid variable name '{}' in '{}'",
                    name, text
                )));
            }

            let value = self
                .get(name)
                .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
            result.push_str(&value.to_string());
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        Ok(result)
    }
}
