//! Model capabilities: classifiers, clusterers and associators
//!
//! The learning algorithms themselves live outside this crate. Actors only
//! see these traits and the closed [`Model`] variant that unifies them.

use std::fmt;
use std::sync::Arc;

use crate::dataset::{Dataset, Instance};
use crate::error::{Error, Result};

/// Class or cluster membership probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution(Vec<f64>);

impl Distribution {
    /// Create a new distribution
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self(probabilities)
    }

    /// The probabilities
    pub fn probabilities(&self) -> &[f64] {
        &self.0
    }

    /// Index of the most probable outcome
    pub fn argmax(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Sink that captures per-instance predictions during evaluation
pub trait PredictionOutput: Send + Sync + fmt::Debug {
    /// Name of the output scheme
    fn classname(&self) -> &str;

    /// Scheme options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Fresh copy with an empty buffer
    fn copy(&self) -> Box<dyn PredictionOutput>;

    /// Record one prediction line
    fn append(&mut self, line: &str);

    /// Everything captured so far
    fn buffer(&self) -> String;

    /// Scheme name followed by its options
    fn commandline(&self) -> String {
        to_commandline(self.classname(), &self.options())
    }
}

/// Settings for a cross-validation run
#[derive(Debug)]
pub struct CrossValidation {
    /// Number of folds
    pub folds: usize,

    /// Seed for randomizing the data
    pub seed: u64,

    /// Whether to discard predictions to save memory
    pub discard_predictions: bool,

    /// Optional capture of the predictions
    pub output: Option<Box<dyn PredictionOutput>>,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            folds: 10,
            seed: 1,
            discard_predictions: false,
            output: None,
        }
    }
}

/// Result of evaluating a classifier
pub trait Evaluation: Send + Sync + fmt::Debug {
    /// Human-readable summary, optionally with complexity statistics
    fn summary(&self, title: Option<&str>, complexity: bool) -> String;

    /// Confusion matrix as text
    fn matrix(&self, title: Option<&str>) -> Result<String>;

    /// Predictions captured while evaluating, if an output was attached
    fn predictions(&self) -> Option<String> {
        None
    }
}

/// An evaluation together with the prediction output filled while computing it
#[derive(Debug)]
pub struct CapturedEvaluation {
    evaluation: Arc<dyn Evaluation>,
    output: Box<dyn PredictionOutput>,
}

impl CapturedEvaluation {
    /// Attach a filled prediction output to an evaluation
    pub fn new(evaluation: Arc<dyn Evaluation>, output: Box<dyn PredictionOutput>) -> Self {
        Self { evaluation, output }
    }

    /// The wrapped evaluation
    pub fn evaluation(&self) -> &Arc<dyn Evaluation> {
        &self.evaluation
    }

    /// The filled prediction output
    pub fn output(&self) -> &dyn PredictionOutput {
        self.output.as_ref()
    }
}

impl Evaluation for CapturedEvaluation {
    fn summary(&self, title: Option<&str>, complexity: bool) -> String {
        self.evaluation.summary(title, complexity)
    }

    fn matrix(&self, title: Option<&str>) -> Result<String> {
        self.evaluation.matrix(title)
    }

    fn predictions(&self) -> Option<String> {
        Some(self.output.buffer())
    }
}

/// A classifier capability
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Name of the scheme
    fn classname(&self) -> &str;

    /// Scheme options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Untrained copy carrying the same configuration
    fn copy(&self) -> Box<dyn Classifier>;

    /// Train on a dataset
    fn build(&mut self, data: &dyn Dataset) -> Result<()>;

    /// Class distribution for a row
    fn distribution(&self, instance: &Instance) -> Result<Distribution>;

    /// Cross-validate a copy of this classifier on `data`
    fn cross_validate(&self, data: &dyn Dataset, settings: &mut CrossValidation) -> Result<Arc<dyn Evaluation>>;
}

/// A clusterer capability
pub trait Clusterer: Send + Sync + fmt::Debug {
    /// Name of the scheme
    fn classname(&self) -> &str;

    /// Scheme options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Untrained copy carrying the same configuration
    fn copy(&self) -> Box<dyn Clusterer>;

    /// Train on a dataset
    fn build(&mut self, data: &dyn Dataset) -> Result<()>;

    /// Cluster membership for a row
    fn distribution(&self, instance: &Instance) -> Result<Distribution>;

    /// Cross-validate and return the log-likelihood
    fn cross_validate(&self, data: &dyn Dataset, settings: &mut CrossValidation) -> Result<f64>;
}

/// An association rule learner capability
pub trait Associator: Send + Sync + fmt::Debug {
    /// Name of the scheme
    fn classname(&self) -> &str;

    /// Scheme options
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Untrained copy carrying the same configuration
    fn copy(&self) -> Box<dyn Associator>;

    /// Mine associations from a dataset
    fn build(&mut self, data: &dyn Dataset) -> Result<()>;

    /// Textual description of what was learned
    fn describe(&self) -> String;
}

/// Kind of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Classifier
    Classifier,
    /// Clusterer
    Clusterer,
    /// Associator
    Associator,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Classifier => write!(f, "classifier"),
            ModelKind::Clusterer => write!(f, "clusterer"),
            ModelKind::Associator => write!(f, "associator"),
        }
    }
}

/// Closed variant over the supported model capabilities
#[derive(Debug)]
pub enum Model {
    /// Classifier
    Classifier(Box<dyn Classifier>),
    /// Clusterer
    Clusterer(Box<dyn Clusterer>),
    /// Associator
    Associator(Box<dyn Associator>),
}

impl Model {
    /// Kind of this model
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Classifier(_) => ModelKind::Classifier,
            Model::Clusterer(_) => ModelKind::Clusterer,
            Model::Associator(_) => ModelKind::Associator,
        }
    }

    /// Name of the underlying scheme
    pub fn classname(&self) -> &str {
        match self {
            Model::Classifier(m) => m.classname(),
            Model::Clusterer(m) => m.classname(),
            Model::Associator(m) => m.classname(),
        }
    }

    /// Scheme name followed by its options
    pub fn commandline(&self) -> String {
        let options = match self {
            Model::Classifier(m) => m.options(),
            Model::Clusterer(m) => m.options(),
            Model::Associator(m) => m.options(),
        };
        to_commandline(self.classname(), &options)
    }

    /// Untrained copy carrying the same configuration
    pub fn copy(&self) -> Model {
        match self {
            Model::Classifier(m) => Model::Classifier(m.copy()),
            Model::Clusterer(m) => Model::Clusterer(m.copy()),
            Model::Associator(m) => Model::Associator(m.copy()),
        }
    }

    /// Train this model in place
    pub fn train(&mut self, data: &dyn Dataset) -> Result<()> {
        match self {
            Model::Classifier(m) => m.build(data),
            Model::Clusterer(m) => m.build(data),
            Model::Associator(m) => m.build(data),
        }
    }

    /// Predict a row; associators do not predict
    pub fn predict(&self, instance: &Instance) -> Result<Distribution> {
        match self {
            Model::Classifier(m) => m.distribution(instance),
            Model::Clusterer(m) => m.distribution(instance),
            Model::Associator(m) => Err(Error::Model(format!(
                "{} is an associator and cannot make predictions",
                m.classname()
            ))),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.commandline())
    }
}

/// Join a scheme name and its options into one command line
pub fn to_commandline(classname: &str, options: &[String]) -> String {
    if options.is_empty() {
        classname.to_string()
    } else {
        format!("{} {}", classname, options.join(" "))
    }
}

/// Split a command line into scheme name and options
pub fn split_commandline(commandline: &str) -> Result<(String, Vec<String>)> {
    let mut parts = commandline.split_whitespace().map(str::to_string);
    let classname = parts
        .next()
        .ok_or_else(|| Error::Configuration("empty command line".into()))?;
    Ok((classname, parts.collect()))
}
