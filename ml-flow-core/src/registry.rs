//! Registry turning command lines back into components
//!
//! Options holding components (models, filters, loaders, prediction outputs)
//! are serialized as `classname option option ...`. The registry maps each
//! class name to a constructor receiving the remaining options.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::filter::{AllFilter, DatasetFilter};
use crate::model::{split_commandline, Associator, Classifier, Clusterer, Model, PredictionOutput};
use crate::serialization::Serializer;
use crate::source::Loader;

type Factory<T> = Box<dyn Fn(&[String]) -> Result<Box<T>> + Send + Sync>;

struct Factories<T: ?Sized> {
    entries: HashMap<String, Factory<T>>,
}

impl<T: ?Sized> Factories<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn register<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<T>> + Send + Sync + 'static,
    {
        self.entries.insert(classname.to_string(), Box::new(factory));
    }

    fn contains(&self, classname: &str) -> bool {
        self.entries.contains_key(classname)
    }

    fn create(&self, classname: &str, options: &[String]) -> Result<Box<T>> {
        let factory = self
            .entries
            .get(classname)
            .ok_or_else(|| Error::UnhandledClass(classname.to_string()))?;
        factory(options)
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Constructors for every component kind that can appear in options
pub struct ComponentRegistry {
    classifiers: Factories<dyn Classifier>,
    clusterers: Factories<dyn Clusterer>,
    associators: Factories<dyn Associator>,
    filters: Factories<dyn DatasetFilter>,
    loaders: Factories<dyn Loader>,
    outputs: Factories<dyn PredictionOutput>,
    serializer: Option<Arc<dyn Serializer>>,
}

impl ComponentRegistry {
    /// Create a registry knowing only the identity filter
    pub fn new() -> Self {
        let mut registry = Self {
            classifiers: Factories::new(),
            clusterers: Factories::new(),
            associators: Factories::new(),
            filters: Factories::new(),
            loaders: Factories::new(),
            outputs: Factories::new(),
            serializer: None,
        };
        registry.register_filter(AllFilter::CLASSNAME, |_| Ok(Box::new(AllFilter::new())));
        registry
    }

    /// Register a classifier constructor
    pub fn register_classifier<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Classifier>> + Send + Sync + 'static,
    {
        self.classifiers.register(classname, factory);
    }

    /// Register a clusterer constructor
    pub fn register_clusterer<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Clusterer>> + Send + Sync + 'static,
    {
        self.clusterers.register(classname, factory);
    }

    /// Register an associator constructor
    pub fn register_associator<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Associator>> + Send + Sync + 'static,
    {
        self.associators.register(classname, factory);
    }

    /// Register a filter constructor
    pub fn register_filter<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn DatasetFilter>> + Send + Sync + 'static,
    {
        self.filters.register(classname, factory);
    }

    /// Register a loader constructor
    pub fn register_loader<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Loader>> + Send + Sync + 'static,
    {
        self.loaders.register(classname, factory);
    }

    /// Register a prediction output constructor
    pub fn register_prediction_output<F>(&mut self, classname: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn PredictionOutput>> + Send + Sync + 'static,
    {
        self.outputs.register(classname, factory);
    }

    /// Set the serializer used for reading persisted models
    pub fn set_serializer(&mut self, serializer: Arc<dyn Serializer>) {
        self.serializer = Some(serializer);
    }

    /// The registered serializer
    pub fn serializer(&self) -> Result<Arc<dyn Serializer>> {
        self.serializer
            .clone()
            .ok_or_else(|| Error::Configuration("no serializer registered".into()))
    }

    /// Build a model; classifiers are tried first, then clusterers, then associators
    pub fn model(&self, commandline: &str) -> Result<Model> {
        let (classname, options) = split_commandline(commandline)?;

        if self.classifiers.contains(&classname) {
            Ok(Model::Classifier(self.classifiers.create(&classname, &options)?))
        } else if self.clusterers.contains(&classname) {
            Ok(Model::Clusterer(self.clusterers.create(&classname, &options)?))
        } else if self.associators.contains(&classname) {
            Ok(Model::Associator(self.associators.create(&classname, &options)?))
        } else {
            Err(Error::UnhandledClass(classname))
        }
    }

    /// Build a filter
    pub fn filter(&self, commandline: &str) -> Result<Box<dyn DatasetFilter>> {
        let (classname, options) = split_commandline(commandline)?;
        self.filters.create(&classname, &options)
    }

    /// Build a loader
    pub fn loader(&self, commandline: &str) -> Result<Box<dyn Loader>> {
        let (classname, options) = split_commandline(commandline)?;
        self.loaders.create(&classname, &options)
    }

    /// Build a prediction output
    pub fn prediction_output(&self, commandline: &str) -> Result<Box<dyn PredictionOutput>> {
        let (classname, options) = split_commandline(commandline)?;
        self.outputs.create(&classname, &options)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("classifiers", &self.classifiers.names())
            .field("clusterers", &self.clusterers.names())
            .field("associators", &self.associators.names())
            .field("filters", &self.filters.names())
            .field("loaders", &self.loaders.names())
            .field("outputs", &self.outputs.names())
            .field("serializer", &self.serializer)
            .finish()
    }
}
