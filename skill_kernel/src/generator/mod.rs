//! Generator module - the capability every text-generation backend provides.
//!
//! Concrete backends live outside this crate. The kernel only ever talks to
//! them through [`Generator`] and builds them through a
//! [`GeneratorFactory`] registered under a type id.

#[cfg(any(test, feature = "test-utils"))]
mod echo;
mod factory;

#[cfg(any(test, feature = "test-utils"))]
pub use echo::*;
pub use factory::*;

use context_store::Content;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::GeneratorError;

/// Raw configuration handed to a generator factory.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// A text-generation backend.
///
/// `generate` blocks until the backend answers. Implementations may read the
/// input's predecessor chain as conversation history, oldest turn first (see
/// [`Content::history`]).
pub trait Generator: Send + Sync {
    fn generate(&self, input: &Content) -> Result<Content, GeneratorError>;
}

impl<F> Generator for F
where
    F: Fn(&Content) -> Result<Content, GeneratorError> + Send + Sync,
{
    fn generate(&self, input: &Content) -> Result<Content, GeneratorError> {
        self(input)
    }
}

/// Declares one generator instance: which factory builds it and with what
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "typeID", alias = "type_id")]
    pub type_id: String,

    #[serde(default)]
    pub config: ConfigMap,
}

impl GeneratorConfig {
    /// Create a config for the given generator type with an empty mapping.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            config: ConfigMap::new(),
        }
    }

    /// Add a configuration entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Decode the mapping into a backend's typed configuration.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, GeneratorError> {
        decode_config(&self.config)
    }
}

/// Decode a raw configuration mapping into a typed configuration by going
/// through an intermediate JSON value. Any shape mismatch is an error.
pub fn decode_config<T: DeserializeOwned>(config: &ConfigMap) -> Result<T, GeneratorError> {
    serde_json::from_value(serde_json::Value::Object(config.clone()))
        .map_err(GeneratorError::InvalidConfig)
}

/// Named generator instances available to the functions of a skill.
#[derive(Clone, Default)]
pub struct Generators {
    entries: BTreeMap<String, Arc<dyn Generator>>,
}

impl Generators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named generator.
    pub fn insert(&mut self, name: impl Into<String>, generator: Arc<dyn Generator>) {
        self.entries.insert(name.into(), generator);
    }

    /// Builder form of [`Generators::insert`].
    pub fn with(mut self, name: impl Into<String>, generator: Arc<dyn Generator>) -> Self {
        self.insert(name, generator);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Generator>> {
        self.entries.get(name)
    }

    /// The first of the given names that is configured.
    pub fn find_any<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Option<&Arc<dyn Generator>> {
        names.into_iter().find_map(|name| self.entries.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Generators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
