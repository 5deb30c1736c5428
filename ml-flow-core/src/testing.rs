//! In-memory stand-ins for the external capabilities
//!
//! Small deterministic implementations of the model, filter, evaluation,
//! prediction output and loader capabilities, plus dataset fixtures. Used by
//! the tests of this workspace and available to dependents through the
//! `testing` feature.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::dataset::{Dataset, InMemoryDataset, Instance, Value};
use crate::error::{Error, Result};
use crate::filter::DatasetFilter;
use crate::model::{Associator, Classifier, Clusterer, CrossValidation, Distribution, Evaluation, PredictionOutput};
use crate::registry::ComponentRegistry;
use crate::schema::{ClassIndex, DataType, Field, Schema};
use crate::source::{Loaded, Loader};

/// Predicts the most frequent class label seen during training
#[derive(Debug, Clone, Default)]
pub struct MajorityClassifier {
    counts: Option<Vec<f64>>,
}

impl MajorityClassifier {
    /// Scheme name
    pub const CLASSNAME: &'static str = "rules.Majority";

    /// Create an untrained classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `build` has been called
    pub fn is_trained(&self) -> bool {
        self.counts.is_some()
    }

    fn label_counts(data: &dyn Dataset) -> Result<Vec<f64>> {
        let header = data.header();
        let class = header
            .class_index()
            .ok_or_else(|| Error::Dataset("Class attribute not set!".into()))?;
        let data_type = header.fields()[class].data_type().clone();
        let DataType::Nominal(labels) = &data_type else {
            return Err(Error::Dataset(format!("class attribute must be nominal, got {}", data_type)));
        };

        let mut counts = vec![0.0; labels.len()];
        for row in data.rows() {
            let index = match row.value(class) {
                Some(Value::Text(label)) => data_type.label_index(label),
                Some(Value::Number(v)) if *v >= 0.0 => Some(*v as usize),
                _ => None,
            };
            if let Some(slot) = index.and_then(|i| counts.get_mut(i)) {
                *slot += 1.0;
            }
        }
        Ok(counts)
    }
}

impl Classifier for MajorityClassifier {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn Classifier> {
        Box::new(MajorityClassifier::new())
    }

    fn build(&mut self, data: &dyn Dataset) -> Result<()> {
        self.counts = Some(Self::label_counts(data)?);
        Ok(())
    }

    fn distribution(&self, _instance: &Instance) -> Result<Distribution> {
        let Some(counts) = &self.counts else {
            return Ok(Distribution::new(Vec::new()));
        };
        let total: f64 = counts.iter().sum();
        if total == 0.0 {
            return Ok(Distribution::new(vec![0.0; counts.len()]));
        }
        Ok(Distribution::new(counts.iter().map(|c| c / total).collect()))
    }

    fn cross_validate(&self, data: &dyn Dataset, settings: &mut CrossValidation) -> Result<Arc<dyn Evaluation>> {
        if settings.folds < 2 {
            return Err(Error::InvalidOption {
                option: "folds".into(),
                reason: format!("need at least 2 folds, got {}", settings.folds),
            });
        }

        let counts = Self::label_counts(data)?;
        let total: f64 = counts.iter().sum();
        let correct = counts.iter().copied().fold(0.0, f64::max);

        if !settings.discard_predictions {
            if let Some(output) = settings.output.as_mut() {
                for (i, row) in data.rows().enumerate() {
                    output.append(&format!("{} {}", i + 1, row));
                }
            }
        }

        Ok(Arc::new(StubEvaluation {
            instances: total,
            correct,
            folds: settings.folds,
            seed: settings.seed,
        }))
    }
}

/// Evaluation with fixed counts
#[derive(Debug, Clone, PartialEq)]
pub struct StubEvaluation {
    /// Evaluated instances
    pub instances: f64,
    /// Correctly classified instances
    pub correct: f64,
    /// Folds used
    pub folds: usize,
    /// Seed used
    pub seed: u64,
}

impl Evaluation for StubEvaluation {
    fn summary(&self, title: Option<&str>, complexity: bool) -> String {
        let mut text = String::new();
        if let Some(title) = title {
            text.push_str(title);
            text.push_str("\n\n");
        }
        text.push_str(&format!("Correctly Classified Instances {}\n", self.correct));
        text.push_str(&format!("Total Number of Instances {}\n", self.instances));
        if complexity {
            text.push_str(&format!("Folds {} Seed {}\n", self.folds, self.seed));
        }
        text
    }

    fn matrix(&self, title: Option<&str>) -> Result<String> {
        Ok(format!(
            "{}\n{} {}",
            title.unwrap_or("=== Confusion Matrix ==="),
            self.correct,
            self.instances - self.correct
        ))
    }
}

/// Clusterer reporting a fixed log-likelihood, configurable with `-L <value>`
#[derive(Debug, Clone)]
pub struct FixedClusterer {
    log_likelihood: f64,
    rows_seen: usize,
}

impl FixedClusterer {
    /// Scheme name
    pub const CLASSNAME: &'static str = "clusterers.Fixed";

    /// Create a clusterer reporting `log_likelihood`
    pub fn new(log_likelihood: f64) -> Self {
        Self {
            log_likelihood,
            rows_seen: 0,
        }
    }

    /// Rows seen by the last `build`
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    /// Build from command line options
    pub fn from_options(options: &[String]) -> Result<Self> {
        match options {
            [] => Ok(Self::new(-1.0)),
            [flag, value] if flag == "-L" => value
                .parse()
                .map(Self::new)
                .map_err(|_| Error::Configuration(format!("invalid log-likelihood: {}", value))),
            other => Err(Error::Configuration(format!("unknown options: {}", other.join(" ")))),
        }
    }
}

impl Clusterer for FixedClusterer {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn options(&self) -> Vec<String> {
        vec!["-L".into(), self.log_likelihood.to_string()]
    }

    fn copy(&self) -> Box<dyn Clusterer> {
        Box::new(Self::new(self.log_likelihood))
    }

    fn build(&mut self, data: &dyn Dataset) -> Result<()> {
        self.rows_seen = data.num_rows();
        Ok(())
    }

    fn distribution(&self, _instance: &Instance) -> Result<Distribution> {
        Ok(Distribution::new(vec![1.0]))
    }

    fn cross_validate(&self, _data: &dyn Dataset, _settings: &mut CrossValidation) -> Result<f64> {
        Ok(self.log_likelihood)
    }
}

/// Associator that only counts the rows it was built on
#[derive(Debug, Clone, Default)]
pub struct CountingAssociator {
    rows_seen: usize,
}

impl CountingAssociator {
    /// Scheme name
    pub const CLASSNAME: &'static str = "associations.Counting";

    /// Rows seen by the last `build`
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }
}

impl Associator for CountingAssociator {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn Associator> {
        Box::new(Self::default())
    }

    fn build(&mut self, data: &dyn Dataset) -> Result<()> {
        self.rows_seen = data.num_rows();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} rows", self.rows_seen)
    }
}

/// Identity filter counting how often it is fitted; copies share the counter
#[derive(Debug, Clone)]
pub struct CountingFilter {
    fits: Arc<AtomicUsize>,
    header: Option<Arc<Schema>>,
}

impl CountingFilter {
    /// Scheme name
    pub const CLASSNAME: &'static str = "filters.Counting";

    /// Create a filter with a fresh counter
    pub fn new() -> Self {
        Self::with_counter(Arc::new(AtomicUsize::new(0)))
    }

    /// Create a filter reporting to an existing counter
    pub fn with_counter(fits: Arc<AtomicUsize>) -> Self {
        Self { fits, header: None }
    }

    /// The shared fit counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fits)
    }

    /// Number of fits so far
    pub fn fits(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }
}

impl Default for CountingFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetFilter for CountingFilter {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn DatasetFilter> {
        Box::new(Self::with_counter(self.counter()))
    }

    fn set_input_format(&mut self, header: &Schema) -> Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.header = Some(Arc::new(header.clone()));
        Ok(())
    }

    fn filter(&mut self, data: &dyn Dataset) -> Result<Arc<dyn Dataset>> {
        let header = self
            .header
            .clone()
            .ok_or_else(|| Error::Execution("No input instance format defined".into()))?;
        if let Some(difference) = header.equal_headers(&data.header()) {
            return Err(Error::SchemaMismatch(difference));
        }
        Ok(Arc::new(InMemoryDataset::new(header, data.rows().cloned().collect())?))
    }
}

/// Prediction output collecting lines in memory
#[derive(Debug, Clone, Default)]
pub struct BufferOutput {
    lines: Vec<String>,
}

impl BufferOutput {
    /// Scheme name
    pub const CLASSNAME: &'static str = "output.Buffer";
}

impl PredictionOutput for BufferOutput {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn PredictionOutput> {
        Box::new(Self::default())
    }

    fn append(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn buffer(&self) -> String {
        self.lines.join("\n")
    }
}

/// Loader serving one in-memory dataset for every path
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    data: Arc<InMemoryDataset>,
}

impl MemoryLoader {
    /// Scheme name
    pub const CLASSNAME: &'static str = "loaders.Memory";

    /// Serve `data`
    pub fn new(data: InMemoryDataset) -> Self {
        Self { data: Arc::new(data) }
    }
}

impl Loader for MemoryLoader {
    fn classname(&self) -> &str {
        Self::CLASSNAME
    }

    fn copy(&self) -> Box<dyn Loader> {
        Box::new(self.clone())
    }

    fn load(&self, _path: &Path, incremental: bool) -> Result<Loaded> {
        if incremental {
            let rows: Vec<Result<Instance>> = self.data.instances().iter().cloned().map(Ok).collect();
            Ok(Loaded::Incremental {
                header: self.data.header(),
                rows: Box::new(rows.into_iter()),
            })
        } else {
            Ok(Loaded::Batch(self.data.clone()))
        }
    }
}

/// Four-row dataset with two numeric attributes and a nominal `play` class (unset)
pub fn weather() -> InMemoryDataset {
    let header = Arc::new(Schema::new(
        "weather",
        vec![
            Field::new("temperature", DataType::Numeric, false),
            Field::new("humidity", DataType::Numeric, false),
            Field::new("play", DataType::Nominal(vec!["yes".into(), "no".into()]), false),
        ],
    ));
    let rows = [(85.0, 85.0, "no"), (80.0, 90.0, "no"), (83.0, 86.0, "yes"), (70.0, 96.0, "yes")]
        .iter()
        .map(|(t, h, p)| Instance::new(vec![Value::Number(*t), Value::Number(*h), Value::Text((*p).into())]))
        .collect();

    InMemoryDataset::new(header, rows).expect("weather rows match the header")
}

/// [`weather`] with the last attribute as class
pub fn labelled_weather() -> Arc<dyn Dataset> {
    weather()
        .with_class_index(ClassIndex::Last)
        .expect("weather has a last attribute")
}

/// Dataset with `columns` numeric attributes named `a1..aN` and no rows
pub fn numeric(relation: &str, columns: usize) -> InMemoryDataset {
    let fields = (1..=columns)
        .map(|i| Field::new(&format!("a{}", i), DataType::Numeric, false))
        .collect();
    InMemoryDataset::template(Arc::new(Schema::new(relation, fields)))
}

/// Registry knowing every stand-in of this module
pub fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register_classifier(MajorityClassifier::CLASSNAME, |_| Ok(Box::new(MajorityClassifier::new())));
    registry.register_clusterer(FixedClusterer::CLASSNAME, |options| {
        Ok(Box::new(FixedClusterer::from_options(options)?))
    });
    registry.register_associator(CountingAssociator::CLASSNAME, |_| Ok(Box::new(CountingAssociator::default())));
    registry.register_filter(CountingFilter::CLASSNAME, |_| Ok(Box::new(CountingFilter::new())));
    registry.register_prediction_output(BufferOutput::CLASSNAME, |_| Ok(Box::new(BufferOutput::default())));
    registry.register_loader(MemoryLoader::CLASSNAME, |_| Ok(Box::new(MemoryLoader::new(weather()))));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn test_majority_classifier() {
        let data = labelled_weather();
        let mut classifier = MajorityClassifier::new();
        let row = data.rows().next().unwrap().clone();
        assert!(classifier.distribution(&row).unwrap().probabilities().is_empty());

        classifier.build(data.as_ref()).unwrap();
        assert_eq!(classifier.distribution(&row).unwrap().probabilities(), &[0.5, 0.5]);
        assert!(classifier.copy().distribution(&row).unwrap().probabilities().is_empty());
    }

    #[test]
    fn test_majority_requires_class() {
        let mut classifier = MajorityClassifier::new();
        assert!(matches!(classifier.build(&weather()), Err(Error::Dataset(_))));
    }

    #[test]
    fn test_registry_builds_stand_ins() {
        let registry = registry();
        assert!(matches!(registry.model("rules.Majority"), Ok(Model::Classifier(_))));
        let clusterer = registry.model("clusterers.Fixed -L -2.5").unwrap();
        assert_eq!(clusterer.commandline(), "clusterers.Fixed -L -2.5");
        assert!(matches!(registry.model("associations.Counting"), Ok(Model::Associator(_))));
    }

    #[test]
    fn test_counting_filter_shares_counter_across_copies() {
        let filter = CountingFilter::new();
        let mut copy = filter.copy();
        copy.set_input_format(&weather().header()).unwrap();
        assert_eq!(filter.fits(), 1);
        assert_eq!(copy.filter(&weather()).unwrap().num_rows(), 4);
    }
}
