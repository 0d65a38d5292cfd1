//! Echo generator for tests and local wiring checks.

use context_store::{Content, Role};
use serde::Deserialize;

use super::{ConfigFactory, Generator, GeneratorFactory};
use crate::error::GeneratorError;

/// Type id the echo factory registers under.
pub const ECHO_TYPE_ID: &str = "echo";

/// Configuration for [`EchoGenerator`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EchoConfig {
    /// Text placed in front of every reply.
    #[serde(default)]
    pub prefix: String,

    /// Reply with the whole conversation (`role: text` per line) instead of
    /// only the newest turn.
    #[serde(default)]
    pub include_history: bool,
}

/// Replies with the input it receives, as an assistant message.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator {
    config: EchoConfig,
}

impl EchoGenerator {
    pub fn new(config: EchoConfig) -> Self {
        Self { config }
    }
}

impl Generator for EchoGenerator {
    fn generate(&self, input: &Content) -> Result<Content, GeneratorError> {
        let text = if self.config.include_history {
            input
                .history()
                .iter()
                .map(|turn| {
                    let text = turn.own_value().map(ToString::to_string).unwrap_or_default();
                    format!("{}: {}", turn.own_role(), text)
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            input.string_value()
        };
        Ok(Content::from_value(format!("{}{}", self.config.prefix, text)).with_role(Role::Assistant))
    }
}

/// Factory for [`EchoGenerator`] registered under [`ECHO_TYPE_ID`].
pub fn echo_factory() -> impl GeneratorFactory {
    ConfigFactory::new(ECHO_TYPE_ID, |config: EchoConfig| Ok(EchoGenerator::new(config)))
}
