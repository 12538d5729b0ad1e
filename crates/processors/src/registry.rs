//! Processor registry - processor creation by type name
//!
//! Maps the `type` tag of a processor config to the factory that builds it.

use std::collections::HashMap;

use ferry_config::{PipelineConfig, ProcessorConfig};

use crate::chain::Chain;
use crate::decode::DecodeFactory;
use crate::{Processor, ProcessorError, ProcessorResult};

/// Builds processors of one type
pub trait ProcessorFactory: Send + Sync {
    /// Create a processor instance from its configuration
    ///
    /// # Errors
    /// Returns `ProcessorError::Config` if the configuration is invalid
    fn create(&self, config: &ProcessorConfig) -> ProcessorResult<Box<dyn Processor>>;

    /// Human-readable name for this factory
    fn name(&self) -> &'static str;
}

/// Registry of processor factories keyed by type name
pub struct ProcessorRegistry {
    factories: HashMap<String, Box<dyn ProcessorFactory>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory
    ///
    /// # Panics
    /// Panics if a factory is already registered under `type_name`. Use
    /// `try_register` for fallible registration.
    pub fn register<F: ProcessorFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if !self.try_register(type_name, factory) {
            panic!("processor factory '{type_name}' already registered");
        }
    }

    /// Register a factory, returning false if the name is taken
    pub fn try_register<F: ProcessorFactory + 'static>(&mut self, type_name: &str, factory: F) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
        true
    }

    /// Create a processor for `config`
    pub fn create(&self, config: &ProcessorConfig) -> ProcessorResult<Box<dyn Processor>> {
        let type_name = config.type_name();
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ProcessorError::UnknownType {
                type_name: type_name.to_string(),
                available: self.available_types().join(", "),
            })?;
        factory.create(config)
    }

    /// Build the chain for a pipeline section
    pub fn chain(&self, config: &PipelineConfig) -> ProcessorResult<Chain> {
        let processors = config
            .processors
            .iter()
            .map(|c| self.create(c))
            .collect::<ProcessorResult<Vec<_>>>()?;
        Ok(Chain::new(processors))
    }

    /// Whether a type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every built-in processor
pub fn default_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry.register("decode", DecodeFactory);
    registry
}
