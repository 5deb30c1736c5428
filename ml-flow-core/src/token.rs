//! Tokens: the unit of data flowing between actors

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::container::ModelContainer;
use crate::dataset::{Dataset, Instance};
use crate::model::Evaluation;

/// Kind of a payload, used for input type checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// No value
    Null,
    /// Boolean
    Boolean,
    /// Integer number
    Integer,
    /// Floating point number
    Number,
    /// Text (also file paths)
    Text,
    /// Whole dataset
    Dataset,
    /// Single row
    Instance,
    /// Model plus header
    Container,
    /// Evaluation result
    Evaluation,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Null => "Null",
            PayloadKind::Boolean => "Boolean",
            PayloadKind::Integer => "Integer",
            PayloadKind::Number => "Number",
            PayloadKind::Text => "Text",
            PayloadKind::Dataset => "Dataset",
            PayloadKind::Instance => "Instance",
            PayloadKind::Container => "ModelContainer",
            PayloadKind::Evaluation => "Evaluation",
        };
        f.write_str(name)
    }
}

/// The value carried by a token
#[derive(Debug, Clone)]
pub enum Payload {
    /// No value
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Text (also file paths)
    Text(String),
    /// Whole dataset
    Dataset(Arc<dyn Dataset>),
    /// Single row
    Instance(Instance),
    /// Model plus header
    Container(Arc<ModelContainer>),
    /// Evaluation result
    Evaluation(Arc<dyn Evaluation>),
}

impl Payload {
    /// Kind of this payload
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Null => PayloadKind::Null,
            Payload::Boolean(_) => PayloadKind::Boolean,
            Payload::Integer(_) => PayloadKind::Integer,
            Payload::Number(_) => PayloadKind::Number,
            Payload::Text(_) => PayloadKind::Text,
            Payload::Dataset(_) => PayloadKind::Dataset,
            Payload::Instance(_) => PayloadKind::Instance,
            Payload::Container(_) => PayloadKind::Container,
            Payload::Evaluation(_) => PayloadKind::Evaluation,
        }
    }

    /// Text view
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of integers and floats
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Integer(v) => Some(*v as f64),
            Payload::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Payload::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Dataset view
    pub fn as_dataset(&self) -> Option<&Arc<dyn Dataset>> {
        match self {
            Payload::Dataset(d) => Some(d),
            _ => None,
        }
    }

    /// Row view
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Payload::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Container view
    pub fn as_container(&self) -> Option<&Arc<ModelContainer>> {
        match self {
            Payload::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Evaluation view
    pub fn as_evaluation(&self) -> Option<&Arc<dyn Evaluation>> {
        match self {
            Payload::Evaluation(e) => Some(e),
            _ => None,
        }
    }
}

/// Formats numbers the way they are substituted into expressions: integers
/// plain, floats always with a fractional part.
impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Null => write!(f, "None"),
            Payload::Boolean(v) => write!(f, "{}", v),
            Payload::Integer(v) => write!(f, "{}", v),
            Payload::Number(v) => write!(f, "{:?}", v),
            Payload::Text(s) => write!(f, "{}", s),
            Payload::Dataset(d) => write!(f, "{}", d.header()),
            Payload::Instance(i) => write!(f, "{}", i),
            Payload::Container(c) => write!(f, "{}", c),
            Payload::Evaluation(e) => write!(f, "{}", e.summary(None, false)),
        }
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Boolean(v)
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Integer(v)
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Number(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<Instance> for Payload {
    fn from(v: Instance) -> Self {
        Payload::Instance(v)
    }
}

impl From<Arc<dyn Dataset>> for Payload {
    fn from(v: Arc<dyn Dataset>) -> Self {
        Payload::Dataset(v)
    }
}

impl From<ModelContainer> for Payload {
    fn from(v: ModelContainer) -> Self {
        Payload::Container(Arc::new(v))
    }
}

impl From<Arc<dyn Evaluation>> for Payload {
    fn from(v: Arc<dyn Evaluation>) -> Self {
        Payload::Evaluation(v)
    }
}

/// An immutable envelope carrying one payload through the graph
#[derive(Debug, Clone)]
pub struct Token {
    payload: Payload,
    timestamp: Option<SystemTime>,
}

impl Token {
    /// Create a token without a timestamp
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            timestamp: None,
        }
    }

    /// Create a token stamped with the current time
    pub fn stamped(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            timestamp: Some(SystemTime::now()),
        }
    }

    /// The payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the token, returning the payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Creation time, if the token was stamped
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting_matches_expression_substitution() {
        assert_eq!(Payload::from(4_i64).to_string(), "4");
        assert_eq!(Payload::from(5.0).to_string(), "5.0");
        assert_eq!(Payload::from(0.25).to_string(), "0.25");
        assert_eq!(Payload::from("path/to/file").to_string(), "path/to/file");
    }

    #[test]
    fn test_token_accessors() {
        let token = Token::stamped(2_i64);
        assert!(token.timestamp().is_some());
        assert_eq!(token.payload().kind(), PayloadKind::Integer);
        assert_eq!(token.payload().as_f64(), Some(2.0));
        assert!(Token::new("x").timestamp().is_none());
    }
}
