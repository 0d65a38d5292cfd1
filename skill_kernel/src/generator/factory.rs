//! Generator factories - build generators from raw configuration.

use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{decode_config, ConfigMap, Generator};
use crate::error::GeneratorError;

/// Builds generator instances of one type from raw configuration.
pub trait GeneratorFactory: Send + Sync {
    /// The type id this factory is registered under.
    fn type_id(&self) -> &str;

    /// Build a generator from a configuration mapping.
    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Generator>, GeneratorError>;
}

/// A factory that decodes the configuration mapping into a typed config `C`
/// and hands it to a constructor.
pub struct ConfigFactory<C, F> {
    type_id: String,
    build: F,
    _config: PhantomData<fn() -> C>,
}

impl<C, F, G> ConfigFactory<C, F>
where
    C: DeserializeOwned,
    F: Fn(C) -> Result<G, GeneratorError> + Send + Sync,
    G: Generator + 'static,
{
    pub fn new(type_id: impl Into<String>, build: F) -> Self {
        Self {
            type_id: type_id.into(),
            build,
            _config: PhantomData,
        }
    }
}

impl<C, F, G> GeneratorFactory for ConfigFactory<C, F>
where
    C: DeserializeOwned,
    F: Fn(C) -> Result<G, GeneratorError> + Send + Sync,
    G: Generator + 'static,
{
    fn type_id(&self) -> &str {
        &self.type_id
    }

    fn create(&self, config: &ConfigMap) -> Result<Arc<dyn Generator>, GeneratorError> {
        let typed: C = decode_config(config)?;
        let generator = (self.build)(typed)?;
        Ok(Arc::new(generator))
    }
}
