//! Skills - named groups of functions.
//!
//! A skill is assembled once (in code or from a [`SkillDefinition`]) and is
//! read-only after it is added to the kernel.

mod definition;
mod function;
mod parameter;

pub use definition::*;
pub use function::*;
pub use parameter::*;

use context_store::Content;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::KernelError;

/// A named group of functions.
#[derive(Debug, Default)]
pub struct Skill {
    pub name: String,

    pub description: String,

    /// Whether a planner may use this skill.
    pub plannable: bool,

    functions: BTreeMap<String, Arc<Function>>,
}

impl Skill {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Build a skill from functions keyed by name. A function without a name
    /// takes its key.
    pub fn from_functions(
        name: impl Into<String>,
        description: impl Into<String>,
        functions: BTreeMap<String, Function>,
    ) -> Self {
        let mut skill = Self::new(name, description);
        for (key, mut function) in functions {
            if function.name.is_empty() {
                function.name = key.clone();
            }
            skill.functions.insert(key, Arc::new(function));
        }
        skill
    }

    pub fn with_plannable(mut self, plannable: bool) -> Self {
        self.plannable = plannable;
        self
    }

    /// Add a function under its own name.
    pub fn add_function(&mut self, function: Function) -> Result<(), KernelError> {
        if self.functions.contains_key(&function.name) {
            return Err(KernelError::DuplicateFunction {
                skill: self.name.clone(),
                function: function.name,
            });
        }
        self.functions.insert(function.name.clone(), Arc::new(function));
        Ok(())
    }

    /// Builder form of [`Skill::add_function`].
    pub fn with_function(mut self, function: Function) -> Result<Self, KernelError> {
        self.add_function(function)?;
        Ok(self)
    }

    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.functions.values()
    }

    /// Names of the functions, in order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Call one of this skill's functions on `input`.
    pub fn call(&self, function: &str, input: &mut Content) -> Result<Content, KernelError> {
        let found = self
            .function(function)
            .ok_or_else(|| KernelError::FunctionNotFound {
                skill: self.name.clone(),
                function: function.to_string(),
            })?;
        found.validate(input)?;
        found.invoke(input)
    }
}
