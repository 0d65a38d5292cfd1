//! Error types for skills, generators and the kernel.

/// Errors reported by a generator backend or its factory.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A configuration entry the backend needs is absent.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The configuration mapping does not fit the backend's typed config.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    /// The backend answered without any completion.
    #[error("backend returned no completions")]
    EmptyResponse,

    /// The backend reported an error payload.
    #[error("backend error: {0}")]
    Backend(String),

    /// Any other failure inside the backend.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from building skills and running calls.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Required parameters were absent after defaulting. Lists every missing
    /// parameter of the function, not just the first.
    #[error("function `{function}` is missing required parameters: {}", format_names(.parameters))]
    MissingParameters {
        function: String,
        parameters: Vec<String>,
    },

    #[error("skill `{0}` not found")]
    SkillNotFound(String),

    #[error("function `{function}` not found in skill `{skill}`")]
    FunctionNotFound { skill: String, function: String },

    /// No factory is registered for a generator type id.
    #[error("unknown generator type `{0}`")]
    GeneratorTypeUnknown(String),

    #[error("constructing generator of type `{type_id}` failed: {source}")]
    GeneratorConstructionFailed {
        type_id: String,
        #[source]
        source: GeneratorError,
    },

    /// A function names a generator instance its skill does not configure.
    #[error("generator `{generator}` not configured for function `{function}`")]
    GeneratorNotConfigured { function: String, generator: String },

    #[error("template `{name}` is invalid: {source}")]
    TemplateInvalid {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("rendering template for function `{function}` failed: {source}")]
    TemplateRenderFailed {
        function: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    #[error("generation for function `{function}` failed: {source}")]
    GenerateFailed {
        function: String,
        #[source]
        source: GeneratorError,
    },

    /// A function path is not of the form `skill.function`.
    #[error("invalid function path `{0}`, expected `skill.function`")]
    InvalidPath(String),

    #[error("skill `{0}` is already registered")]
    DuplicateSkill(String),

    #[error("generator type `{0}` is already registered")]
    DuplicateGenerator(String),

    #[error("function `{function}` is already defined in skill `{skill}`")]
    DuplicateFunction { skill: String, function: String },

    #[error("invalid skill definition: {0}")]
    InvalidDefinition(String),

    #[error("no functions to call")]
    EmptyChain,

    /// Several paths of a batch lookup failed; one error per path.
    #[error("{} function paths could not be resolved: {}", .0.len(), format_errors(.0))]
    Unresolved(Vec<KernelError>),
}

impl KernelError {
    /// Whether the error was raised before any template was rendered or
    /// generator invoked.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingParameters { .. }
                | Self::SkillNotFound(_)
                | Self::FunctionNotFound { .. }
                | Self::InvalidPath(_)
                | Self::EmptyChain
                | Self::Unresolved(_)
        )
    }

    /// Names of the missing parameters, if this is a missing-parameter error.
    pub fn missing_parameters(&self) -> &[String] {
        match self {
            Self::MissingParameters { parameters, .. } => parameters,
            _ => &[],
        }
    }
}

fn format_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_errors(errors: &[KernelError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
