//! Actor options: typed values, variable-aware resolution and help tables
//!
//! Each actor kind keeps its configuration in a typed record. Fields hold an
//! [`OptionValue`], which is either a typed literal or text that may contain
//! `@{name}` variable references. References are substituted from the
//! run's storage when the actor executes, and only then is the text parsed
//! into the field's type.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::context::FlowContext;
use crate::error::{Error, Result};
use crate::registry::ComponentRegistry;

/// Name and help string of one option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionHelp {
    /// Option name
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
}

impl OptionHelp {
    /// Create a help entry
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self { name, help }
    }
}

/// A configured option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue<T> {
    /// Typed literal
    Value(T),
    /// Text, possibly with variable references, parsed at execution time
    Text(String),
}

impl<T> OptionValue<T> {
    /// Text form that is parsed when the actor executes
    pub fn text(text: impl Into<String>) -> Self {
        OptionValue::Text(text.into())
    }
}

impl<T> From<T> for OptionValue<T> {
    fn from(value: T) -> Self {
        OptionValue::Value(value)
    }
}

impl<T: fmt::Display> fmt::Display for OptionValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Value(v) => write!(f, "{}", v),
            OptionValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Types an option can be resolved into
pub trait OptionType: Clone + fmt::Debug {
    /// Parse the (already expanded) textual form
    fn parse_option(text: &str) -> std::result::Result<Self, String>;

    /// Literals that are themselves text get expanded too
    fn as_text(&self) -> Option<&str> {
        None
    }
}

impl OptionType for String {
    fn parse_option(text: &str) -> std::result::Result<Self, String> {
        Ok(text.to_string())
    }

    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl OptionType for bool {
    fn parse_option(text: &str) -> std::result::Result<Self, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(format!("not a boolean: '{}'", other)),
        }
    }
}

macro_rules! numeric_option_type {
    ($($t:ty),*) => {
        $(
            impl OptionType for $t {
                fn parse_option(text: &str) -> std::result::Result<Self, String> {
                    text.trim()
                        .parse::<$t>()
                        .map_err(|e| format!("'{}': {}", text, e))
                }
            }
        )*
    };
}

numeric_option_type!(i64, u64, usize, f64);

/// Resolve an option value against the run's storage.
///
/// Read-only against the storage. Variable errors (unknown name, no storage
/// handler) are returned as they are; a value that cannot be parsed into `T`
/// becomes [`Error::InvalidOption`].
pub fn resolve<T: OptionType>(ctx: &FlowContext, name: &str, value: &OptionValue<T>) -> Result<T> {
    let raw = match value {
        OptionValue::Value(v) => match v.as_text() {
            Some(text) => text,
            None => return Ok(v.clone()),
        },
        OptionValue::Text(text) => text.as_str(),
    };

    let expanded = ctx.expand(raw)?;
    trace!(option = name, raw, expanded = %expanded, "resolved option");
    T::parse_option(&expanded).map_err(|reason| Error::InvalidOption {
        option: name.to_string(),
        reason,
    })
}

/// Resolve an optional option value
pub fn resolve_optional<T: OptionType>(
    ctx: &FlowContext,
    name: &str,
    value: Option<&OptionValue<T>>,
) -> Result<Option<T>> {
    value.map(|v| resolve(ctx, name, v)).transpose()
}

/// Typed option record of one actor kind
///
/// `to_options`/`from_options` are the explicit serialize/deserialize pair.
/// Primitive fields go through serde; components (models, filters, loaders)
/// are written as command lines and read back through the registry.
pub trait OptionHandler: Sized {
    /// Help for every option the record carries
    fn help() -> &'static [OptionHelp];

    /// Serialize into an option map
    fn to_options(&self) -> Result<Value>;

    /// Deserialize from an option map, filling absent options with defaults
    fn from_options(options: &Value, registry: &ComponentRegistry) -> Result<Self>;
}

/// Serialize a record's primitive fields into an option map
pub fn to_option_map<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Configuration(format!(
            "options must serialize to a map, got {}",
            other
        ))),
    }
}

/// Deserialize a record's primitive fields, rejecting unknown option names
pub fn from_option_map<T: DeserializeOwned>(options: &Value, help: &[OptionHelp]) -> Result<T> {
    check_known_options(options, help)?;
    Ok(T::deserialize(options)?)
}

/// Fail when an option map names an option the actor does not have
pub fn check_known_options(options: &Value, help: &[OptionHelp]) -> Result<()> {
    let map = options
        .as_object()
        .ok_or_else(|| Error::Configuration(format!("options must be a map, got {}", options)))?;

    for key in map.keys() {
        if !help.iter().any(|h| h.name == key) {
            return Err(Error::InvalidOption {
                option: key.clone(),
                reason: "unknown option".into(),
            });
        }
    }

    Ok(())
}

/// Read an optional string field from an option map
pub fn option_str<'a>(options: &'a Value, name: &str) -> Result<Option<&'a str>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::InvalidOption {
            option: name.to_string(),
            reason: format!("expected a command line string, got {}", other),
        }),
    }
}
