//! Training and cross-validating models

use std::sync::Arc;

use ml_flow_core::model::{CapturedEvaluation, CrossValidation, PredictionOutput};
use ml_flow_core::options::{from_option_map, option_str, resolve, to_option_map};
use ml_flow_core::{
    Accepts, ComponentRegistry, Dataset, Error, FlowContext, Model, ModelContainer, OptionHandler, OptionHelp,
    OptionValue, OutputQueue, PayloadKind, Result, Token, Transformer,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::unexpected_payload;

fn dataset_input<'a>(kind: &str, input: &'a Token) -> Result<&'a Arc<dyn Dataset>> {
    input.payload().as_dataset().ok_or_else(|| unexpected_payload(kind, input))
}

fn setup_commandline(setup: Option<&Model>) -> String {
    setup.map_or_else(|| "None".to_string(), Model::commandline)
}

fn no_setup() -> Error {
    Error::UnhandledClass("None".into())
}

fn insert_setup(map: &mut Map<String, Value>, setup: Option<&Model>) {
    let value = setup.map_or(Value::Null, |model| Value::String(model.commandline()));
    map.insert("setup".into(), value);
}

fn read_setup(options: &Value, registry: &ComponentRegistry) -> Result<Option<Model>> {
    option_str(options, "setup")?.map(|line| registry.model(line)).transpose()
}

const TRAIN_HELP: &[OptionHelp] = &[OptionHelp::new(
    "setup",
    "The classifier/clusterer/associator to train (Classifier/Clusterer/Associator).",
)];

/// Options of [`Train`]
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Untrained template; copied for every dataset
    #[serde(skip)]
    pub setup: Option<Model>,
}

impl OptionHandler for TrainOptions {
    fn help() -> &'static [OptionHelp] {
        TRAIN_HELP
    }

    fn to_options(&self) -> Result<Value> {
        let mut map = to_option_map(self)?;
        insert_setup(&mut map, self.setup.as_ref());
        Ok(Value::Object(map))
    }

    fn from_options(options: &Value, registry: &ComponentRegistry) -> Result<Self> {
        let mut record: Self = from_option_map(options, TRAIN_HELP)?;
        record.setup = read_setup(options, registry)?;
        Ok(record)
    }
}

/// Trains a copy of the configured model and forwards it with the dataset header
#[derive(Debug, Default)]
pub struct Train {
    options: TrainOptions,
}

impl Train {
    /// Kind name
    pub const KIND: &'static str = "Train";

    /// Create the transformer
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    /// The options
    pub fn options(&self) -> &TrainOptions {
        &self.options
    }
}

impl Transformer for Train {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Trains the classifier/clusterer/associator on the incoming dataset and forwards a ModelContainer \
         with the trained model and the dataset header."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!("setup: {}", setup_commandline(self.options.setup.as_ref())))
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Dataset])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        TrainOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, _ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let data = dataset_input(Self::KIND, input)?;
        let mut model = self.options.setup.as_ref().ok_or_else(no_setup)?.copy();

        model.train(data.as_ref())?;
        debug!(model = %model, kind = %model.kind(), rows = data.num_rows(), "trained model");

        output.push(Token::new(ModelContainer::with_header(model, data.header())));
        Ok(())
    }
}

const CROSS_VALIDATE_HELP: &[OptionHelp] = &[
    OptionHelp::new("setup", "The classifier/clusterer to cross-validate (Classifier/Clusterer)."),
    OptionHelp::new("folds", "The number of folds for CV (int)."),
    OptionHelp::new("seed", "The seed value for randomizing the data (int)."),
    OptionHelp::new("discard_predictions", "Discard classifier predictions to save memory (bool)."),
    OptionHelp::new("output", "For capturing the classifier's prediction output (PredictionOutput)."),
];

/// Options of [`CrossValidate`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidateOptions {
    /// Template to evaluate
    #[serde(skip)]
    pub setup: Option<Model>,

    /// Number of folds
    pub folds: OptionValue<usize>,

    /// Seed for randomizing the data
    pub seed: OptionValue<u64>,

    /// Discard classifier predictions to save memory
    pub discard_predictions: OptionValue<bool>,

    /// Capture of the classifier's predictions
    #[serde(skip)]
    pub output: Option<Box<dyn PredictionOutput>>,
}

impl Default for CrossValidateOptions {
    fn default() -> Self {
        Self {
            setup: None,
            folds: OptionValue::Value(10),
            seed: OptionValue::Value(1),
            discard_predictions: OptionValue::Value(false),
            output: None,
        }
    }
}

impl OptionHandler for CrossValidateOptions {
    fn help() -> &'static [OptionHelp] {
        CROSS_VALIDATE_HELP
    }

    fn to_options(&self) -> Result<Value> {
        let mut map = to_option_map(self)?;
        insert_setup(&mut map, self.setup.as_ref());
        let output = self
            .output
            .as_ref()
            .map_or(Value::Null, |output| Value::String(output.commandline()));
        map.insert("output".into(), output);
        Ok(Value::Object(map))
    }

    fn from_options(options: &Value, registry: &ComponentRegistry) -> Result<Self> {
        let mut record: Self = from_option_map(options, CROSS_VALIDATE_HELP)?;
        record.setup = read_setup(options, registry)?;
        record.output = option_str(options, "output")?
            .map(|line| registry.prediction_output(line))
            .transpose()?;
        Ok(record)
    }
}

/// Cross-validates a copy of the configured classifier or clusterer
///
/// Classifiers yield an evaluation token, clusterers their log-likelihood.
/// With an `output` configured, every run fills a fresh copy of it and the
/// evaluation carries the captured predictions.
#[derive(Debug, Default)]
pub struct CrossValidate {
    options: CrossValidateOptions,
}

impl CrossValidate {
    /// Kind name
    pub const KIND: &'static str = "CrossValidate";

    /// Create the transformer
    pub fn new(options: CrossValidateOptions) -> Self {
        Self { options }
    }
}

impl Transformer for CrossValidate {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> &'static str {
        "Cross-validates the classifier/clusterer on the incoming dataset. In case of a classifier, the \
         Evaluation object is forwarded. For clusterers the loglikelihood."
    }

    fn quickinfo(&self) -> Option<String> {
        Some(format!(
            "setup: {}, folds: {}",
            setup_commandline(self.options.setup.as_ref()),
            self.options.folds
        ))
    }

    fn accepts(&self) -> Accepts {
        Accepts::Only(&[PayloadKind::Dataset])
    }

    fn options_help(&self) -> &'static [OptionHelp] {
        CrossValidateOptions::help()
    }

    fn to_options(&self) -> Result<Value> {
        self.options.to_options()
    }

    fn do_execute(&mut self, input: &Token, ctx: &mut FlowContext, output: &mut OutputQueue) -> Result<()> {
        let data = dataset_input(Self::KIND, input)?;
        let mut settings = CrossValidation {
            folds: resolve(ctx, "folds", &self.options.folds)?,
            seed: resolve(ctx, "seed", &self.options.seed)?,
            discard_predictions: resolve(ctx, "discard_predictions", &self.options.discard_predictions)?,
            output: self.options.output.as_ref().map(|output| output.copy()),
        };

        match self.options.setup.as_ref().map(Model::copy) {
            Some(Model::Classifier(classifier)) => {
                let mut evaluation = classifier.cross_validate(data.as_ref(), &mut settings)?;
                if let Some(predictions) = settings.output.take() {
                    debug!(classifier = classifier.classname(), output = %predictions.commandline(), "captured predictions");
                    evaluation = Arc::new(CapturedEvaluation::new(evaluation, predictions));
                }
                output.push(Token::new(evaluation));
            }
            Some(Model::Clusterer(clusterer)) => {
                let log_likelihood = clusterer.cross_validate(data.as_ref(), &mut settings)?;
                debug!(clusterer = clusterer.classname(), log_likelihood, "cross-validated clusterer");
                output.push(Token::new(log_likelihood));
            }
            Some(Model::Associator(associator)) => {
                return Err(Error::UnhandledClass(associator.classname().to_string()));
            }
            None => return Err(no_setup()),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_flow_core::testing::{self, BufferOutput, FixedClusterer, MajorityClassifier};
    use ml_flow_core::{Actor, Payload};
    use serde_json::json;

    fn run(transformer: Box<dyn Transformer>, data: Arc<dyn Dataset>) -> Result<Payload> {
        let mut ctx = FlowContext::new();
        let mut actor = Actor::new("model", transformer);
        actor.input(Token::new(data))?;
        actor.execute(&mut ctx)?;
        Ok(actor.output().map_or(Payload::Null, Token::into_payload))
    }

    #[test]
    fn test_train_forwards_trained_copy_with_header() {
        let registry = testing::registry();
        let options = TrainOptions::from_options(&json!({"setup": "rules.Majority"}), &registry).unwrap();
        let mut train = Train::new(options);
        let data = testing::labelled_weather();
        let row = data.rows().next().cloned().unwrap();

        let mut ctx = FlowContext::new();
        let mut output = OutputQueue::new();
        train.do_execute(&Token::new(Arc::clone(&data)), &mut ctx, &mut output).unwrap();
        let payload = output.pop().unwrap().into_payload();
        let container = payload.as_container().unwrap();
        assert_eq!(container.header.as_ref().unwrap().relation(), "weather");
        assert_eq!(container.model.predict(&row).unwrap().probabilities(), &[0.5, 0.5]);

        // the template itself stays untrained
        let template = train.options().setup.as_ref().unwrap();
        assert!(template.predict(&row).unwrap().probabilities().is_empty());
    }

    #[test]
    fn test_train_without_setup() {
        let err = run(Box::new(Train::default()), testing::labelled_weather()).unwrap_err();
        assert_eq!(err.to_string(), "Unhandled class: None");
        assert_eq!(Train::default().quickinfo().unwrap(), "setup: None");
    }

    #[test]
    fn test_cross_validate_classifier() {
        let options = CrossValidateOptions {
            setup: Some(Model::Classifier(Box::new(MajorityClassifier::new()))),
            folds: OptionValue::Value(4),
            ..Default::default()
        };
        let payload = run(Box::new(CrossValidate::new(options)), testing::labelled_weather()).unwrap();
        let summary = payload.as_evaluation().unwrap().summary(None, true);
        assert!(summary.contains("Correctly Classified Instances 2"));
        assert!(summary.contains("Folds 4 Seed 1"));
    }

    #[test]
    fn test_cross_validate_captures_predictions() {
        let registry = testing::registry();
        let options = CrossValidateOptions::from_options(
            &json!({"setup": MajorityClassifier::CLASSNAME, "folds": 3, "output": BufferOutput::CLASSNAME}),
            &registry,
        )
        .unwrap();
        let mut cv = CrossValidate::new(options);
        let mut ctx = FlowContext::new();
        let mut output = OutputQueue::new();
        let data = Token::new(testing::labelled_weather());

        cv.do_execute(&data, &mut ctx, &mut output).unwrap();
        cv.do_execute(&data, &mut ctx, &mut output).unwrap();

        let first = output.pop().unwrap().into_payload();
        let predictions = first.as_evaluation().unwrap().predictions().unwrap();
        assert_eq!(predictions.lines().count(), 4);
        assert!(predictions.starts_with("1 "));

        // each run gets its own buffer
        let second = output.pop().unwrap().into_payload();
        assert_eq!(second.as_evaluation().unwrap().predictions().unwrap(), predictions);
        assert!(first.as_evaluation().unwrap().summary(None, false).contains("Correctly Classified Instances 2"));
    }

    #[test]
    fn test_cross_validate_without_output_has_no_predictions() {
        let options = CrossValidateOptions {
            setup: Some(Model::Classifier(Box::new(MajorityClassifier::new()))),
            folds: OptionValue::Value(3),
            discard_predictions: OptionValue::Value(true),
            ..Default::default()
        };
        let payload = run(Box::new(CrossValidate::new(options)), testing::labelled_weather()).unwrap();
        assert!(payload.as_evaluation().unwrap().predictions().is_none());
    }

    #[test]
    fn test_cross_validate_clusterer_and_associator() {
        let registry = testing::registry();
        let options =
            CrossValidateOptions::from_options(&json!({"setup": "clusterers.Fixed -L -3.5", "folds": 3}), &registry)
                .unwrap();
        let payload = run(Box::new(CrossValidate::new(options)), testing::labelled_weather()).unwrap();
        assert!(matches!(payload, Payload::Number(v) if (v + 3.5).abs() < 1e-12));

        let options = CrossValidateOptions::from_options(&json!({"setup": "associations.Counting"}), &registry).unwrap();
        let err = run(Box::new(CrossValidate::new(options)), testing::labelled_weather()).unwrap_err();
        assert_eq!(err.to_string(), "Unhandled class: associations.Counting");
    }

    #[test]
    fn test_cross_validate_resolves_variables() {
        let mut ctx = FlowContext::new();
        ctx.storage_mut().unwrap().set("folds", 1_i64);
        let options = CrossValidateOptions {
            setup: Some(Model::Classifier(Box::new(MajorityClassifier::new()))),
            folds: OptionValue::text("@{folds}"),
            ..Default::default()
        };
        let mut actor = Actor::new("cv", Box::new(CrossValidate::new(options)));
        actor.input(Token::new(testing::labelled_weather())).unwrap();
        // a single fold is rejected by the classifier
        assert!(matches!(actor.execute(&mut ctx), Err(Error::InvalidOption { .. })));
    }

    #[test]
    fn test_cross_validate_options_round_trip() {
        let registry = testing::registry();
        let options = json!({
            "setup": "clusterers.Fixed -L -2",
            "folds": "@{folds}",
            "seed": 42,
            "discard_predictions": true,
            "output": "output.Buffer",
        });
        let record = CrossValidateOptions::from_options(&options, &registry).unwrap();
        assert_eq!(record.folds, OptionValue::text("@{folds}"));
        assert!(matches!(record.setup, Some(Model::Clusterer(_))));
        assert_eq!(
            record.to_options().unwrap(),
            json!({
                "setup": format!("{} -L -2", FixedClusterer::CLASSNAME),
                "folds": "@{folds}",
                "seed": 42,
                "discard_predictions": true,
                "output": "output.Buffer",
            })
        );
        assert!(CrossValidateOptions::from_options(&json!({"fold": 3}), &registry).is_err());
    }
}
