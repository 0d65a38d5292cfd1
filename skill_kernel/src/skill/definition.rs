//! Declarative skill records.
//!
//! A loader (filesystem, embedded assets, a database) produces a
//! [`SkillDefinition`] plus the template text of each function. Turning the
//! pair into a [`Skill`] needs no I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::function::{Function, FunctionCall, TemplatedCall};
use super::parameter::Parameter;
use super::Skill;
use crate::error::KernelError;
use crate::generator::{Generator, GeneratorConfig, Generators};
use crate::template::PromptTemplate;

/// Replaces the default templated call of one function at load time.
pub type CallOverride = Box<dyn FnOnce(TemplatedCall) -> FunctionCall + Send>;

/// Call overrides keyed by function name.
pub type CallOverrides = BTreeMap<String, CallOverride>;

/// Configuration record of a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub plannable: bool,

    /// Generator instances the functions of this skill can name.
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorConfig>,

    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDefinition>,
}

/// Configuration record of one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub plannable: bool,

    #[serde(default, alias = "inputProperties")]
    pub parameters: BTreeMap<String, Parameter>,

    /// Name of the generator instance in the skill's `generators`.
    #[serde(default)]
    pub generator: String,
}

impl SkillDefinition {
    pub fn from_json(bytes: &[u8]) -> Result<Self, KernelError> {
        serde_json::from_slice(bytes).map_err(|err| KernelError::InvalidDefinition(err.to_string()))
    }

    pub fn from_toml(text: &str) -> Result<Self, KernelError> {
        toml::from_str(text).map_err(|err| KernelError::InvalidDefinition(err.to_string()))
    }

    /// Build the skill from this record.
    ///
    /// Every function needs a generator from `generators` and at least one
    /// template in `templates`. A function with an entry in `overrides` gets
    /// the call that override returns instead of the default templated call.
    pub fn build(
        self,
        generators: &Generators,
        templates: &SkillTemplates,
        mut overrides: CallOverrides,
    ) -> Result<Skill, KernelError> {
        if self.name.is_empty() {
            return Err(KernelError::InvalidDefinition("skill name is empty".into()));
        }

        let mut functions = BTreeMap::new();
        for (key, definition) in self.functions {
            let name = if definition.name.is_empty() {
                key.clone()
            } else {
                definition.name
            };

            let generator = generators.get(&definition.generator).cloned().ok_or_else(|| {
                KernelError::GeneratorNotConfigured {
                    function: name.clone(),
                    generator: definition.generator.clone(),
                }
            })?;

            let templated = templates
                .get(&key)
                .ok_or_else(|| KernelError::InvalidDefinition(format!("function `{}` has no templates", name)))?
                .templated_call(&self.name, &key, generator)?;

            let call = match overrides.remove(&key) {
                Some(build) => build(templated),
                None => FunctionCall::Templated(templated),
            };

            let mut function =
                Function::new(name, definition.description, call).with_plannable(definition.plannable);
            for (parameter_key, parameter) in definition.parameters {
                function = function.with_parameter(parameter_key, parameter);
            }
            functions.insert(key, function);
        }

        for unused in overrides.keys() {
            warn!(skill = %self.name, function = %unused, "call override names no function");
        }

        Ok(Skill::from_functions(self.name, self.description, functions).with_plannable(self.plannable))
    }
}

/// Template text of one function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionTemplates {
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
}

impl FunctionTemplates {
    fn templated_call(
        &self,
        skill: &str,
        function: &str,
        generator: Arc<dyn Generator>,
    ) -> Result<TemplatedCall, KernelError> {
        let system_prompt = self
            .system_prompt
            .as_ref()
            .map(|source| PromptTemplate::parse(format!("{}.{}.system", skill, function), source.as_str()))
            .transpose()?;

        let call = match (&self.prompt, system_prompt) {
            (Some(source), system_prompt) => {
                let prompt = PromptTemplate::parse(format!("{}.{}", skill, function), source.as_str())?;
                let call = TemplatedCall::new(prompt, generator);
                match system_prompt {
                    Some(system_prompt) => call.with_system_prompt(system_prompt),
                    None => call,
                }
            }
            (None, Some(system_prompt)) => TemplatedCall::conversational(system_prompt, generator),
            (None, None) => {
                return Err(KernelError::InvalidDefinition(format!(
                    "function `{}` has no templates",
                    function
                )))
            }
        };
        Ok(call)
    }
}

/// Template text for the functions of a skill, keyed by function name.
#[derive(Debug, Clone, Default)]
pub struct SkillTemplates {
    functions: BTreeMap<String, FunctionTemplates>,
}

impl SkillTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prompt template of a function.
    pub fn with_prompt(mut self, function: impl Into<String>, source: impl Into<String>) -> Self {
        self.functions.entry(function.into()).or_default().prompt = Some(source.into());
        self
    }

    /// Set the system prompt template of a function.
    pub fn with_system_prompt(mut self, function: impl Into<String>, source: impl Into<String>) -> Self {
        self.functions.entry(function.into()).or_default().system_prompt = Some(source.into());
        self
    }

    pub fn get(&self, function: &str) -> Option<&FunctionTemplates> {
        self.functions.get(function)
    }
}
