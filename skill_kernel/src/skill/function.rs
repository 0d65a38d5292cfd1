//! Function definitions - a named, parameterized call bound to a generator.
//!
//! Calling a function runs through these states:
//! 1. **Validating**: defaults are written and required parameters checked
//! 2. **Rendering**: the prompt template is rendered against the input
//! 3. **Generating**: the bound generator (or native call) produces a response
//! 4. **Linked**: the input becomes the response's predecessor
//!
//! Any failure moves the call to **Failed** and nothing further runs.

use context_store::{Content, Role};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::parameter::{resolve_parameters, Parameter};
use crate::error::{GeneratorError, KernelError};
use crate::generator::Generator;
use crate::template::PromptTemplate;

/// A call implemented directly in Rust.
pub type NativeFn = dyn Fn(&Content) -> Result<Content, GeneratorError> + Send + Sync;

/// Where a function call goes once its input is validated.
pub enum FunctionCall {
    /// Render templates and hand the result to a generator.
    Templated(TemplatedCall),
    /// Call a Rust closure with the validated input.
    Native(Arc<NativeFn>),
}

impl FunctionCall {
    /// Wrap a closure as a native call.
    pub fn native<F>(call: F) -> Self
    where
        F: Fn(&Content) -> Result<Content, GeneratorError> + Send + Sync + 'static,
    {
        FunctionCall::Native(Arc::new(call))
    }
}

impl From<TemplatedCall> for FunctionCall {
    fn from(call: TemplatedCall) -> Self {
        FunctionCall::Templated(call)
    }
}

impl std::fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionCall::Templated(call) => f.debug_tuple("Templated").field(call).finish(),
            FunctionCall::Native(_) => f.write_str("Native"),
        }
    }
}

/// A prompt template, an optional system template and the generator they feed.
pub struct TemplatedCall {
    prompt: Option<PromptTemplate>,
    system_prompt: Option<PromptTemplate>,
    generator: Arc<dyn Generator>,
}

impl TemplatedCall {
    /// A call that renders `prompt` into the input's root value.
    pub fn new(prompt: PromptTemplate, generator: Arc<dyn Generator>) -> Self {
        Self {
            prompt: Some(prompt),
            system_prompt: None,
            generator,
        }
    }

    /// A conversational call. The input's root value goes to the generator
    /// as is, and the first turn gets a rendered system message as its
    /// predecessor.
    pub fn conversational(system_prompt: PromptTemplate, generator: Arc<dyn Generator>) -> Self {
        Self {
            prompt: None,
            system_prompt: Some(system_prompt),
            generator,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: PromptTemplate) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    pub fn prompt(&self) -> Option<&PromptTemplate> {
        self.prompt.as_ref()
    }

    pub fn system_prompt(&self) -> Option<&PromptTemplate> {
        self.system_prompt.as_ref()
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    fn run(&self, function: &str, input: &mut Content) -> Result<Content, KernelError> {
        debug!(function, state = %CallState::Rendering);

        if input.predecessor().is_none() {
            if let Some(system_prompt) = &self.system_prompt {
                let text = render(function, system_prompt, input)?;
                input.set_predecessor(Content::from_value(text).with_role(Role::System));
            }
        }

        if let Some(prompt) = &self.prompt {
            let text = render(function, prompt, input)?;
            input.set(text);
        }

        debug!(function, state = %CallState::Generating);
        self.generator
            .generate(input)
            .map_err(|source| KernelError::GenerateFailed {
                function: function.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for TemplatedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatedCall")
            .field("prompt", &self.prompt.as_ref().map(PromptTemplate::name))
            .field("system_prompt", &self.system_prompt.as_ref().map(PromptTemplate::name))
            .finish_non_exhaustive()
    }
}

fn render(function: &str, template: &PromptTemplate, input: &Content) -> Result<String, KernelError> {
    template
        .render(input)
        .map_err(|err| KernelError::TemplateRenderFailed {
            function: function.to_string(),
            source: Box::new(err),
        })
}

/// Lifecycle state of a single function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Validating,
    Rendering,
    Generating,
    Linked,
    Failed,
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallState::Validating => "validating",
            CallState::Rendering => "rendering",
            CallState::Generating => "generating",
            CallState::Linked => "linked",
            CallState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A named, parameterized call.
#[derive(Debug)]
pub struct Function {
    pub name: String,

    pub description: String,

    /// Whether a planner may pick this function on its own.
    pub plannable: bool,

    /// Declared inputs keyed by name.
    pub parameters: BTreeMap<String, Parameter>,

    call: FunctionCall,
}

impl Function {
    pub fn new(name: impl Into<String>, description: impl Into<String>, call: impl Into<FunctionCall>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            plannable: false,
            parameters: BTreeMap::new(),
            call: call.into(),
        }
    }

    /// Declare a parameter. A parameter without a name takes its key.
    pub fn with_parameter(mut self, key: impl Into<String>, mut parameter: Parameter) -> Self {
        let key = key.into();
        if parameter.name.is_empty() {
            parameter.name = key.clone();
        }
        self.parameters.insert(key, parameter);
        self
    }

    pub fn with_plannable(mut self, plannable: bool) -> Self {
        self.plannable = plannable;
        self
    }

    pub fn call_kind(&self) -> &FunctionCall {
        &self.call
    }

    /// Write defaults into `input` and check that every required parameter
    /// is present.
    pub fn validate(&self, input: &mut Content) -> Result<(), KernelError> {
        debug!(function = %self.name, state = %CallState::Validating);
        resolve_parameters(&self.name, &self.parameters, input).inspect_err(|err| self.log_failure(err))
    }

    /// Validate `input`, then run the call.
    ///
    /// Templated calls replace the input's root value with the rendered
    /// prompt. The returned response has the input as its predecessor.
    pub fn call(&self, input: &mut Content) -> Result<Content, KernelError> {
        self.validate(input)?;
        self.invoke(input)
    }

    /// Run the call without validating.
    pub(crate) fn invoke(&self, input: &mut Content) -> Result<Content, KernelError> {
        let response = match &self.call {
            FunctionCall::Templated(call) => call.run(&self.name, input),
            FunctionCall::Native(call) => {
                debug!(function = %self.name, state = %CallState::Generating);
                call(input).map_err(|source| KernelError::GenerateFailed {
                    function: self.name.clone(),
                    source,
                })
            }
        }
        .inspect_err(|err| self.log_failure(err))?;

        debug!(function = %self.name, state = %CallState::Linked);
        Ok(response.with_predecessor(input.clone()))
    }

    fn log_failure(&self, err: &KernelError) {
        warn!(function = %self.name, state = %CallState::Failed, error = %err, "function call failed");
    }
}
