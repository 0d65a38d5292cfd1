//! Parameter definitions - the declared inputs of a function.

use context_store::{Content, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::KernelError;

/// JSON-schema style type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Object,
    Array,
    Boolean,
    Null,
}

impl ParamType {
    /// Whether a value fits this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.as_str().is_some(),
            ParamType::Number => value.as_f64().is_some(),
            ParamType::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            ParamType::Object => matches!(value, Value::Object(_) | Value::Content(_)),
            ParamType::Array => value.as_array().is_some(),
            ParamType::Boolean => value.as_bool().is_some(),
            ParamType::Null => value.is_null(),
        }
    }
}

/// One named input of a function.
///
/// The name doubles as the dot path the value is read from, so a parameter
/// named `location.latitude` reads a nested property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,

    /// Allowed values, if restricted.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,

    #[serde(default)]
    pub required: bool,

    /// Written into the input when no value is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Parameter {
    /// Create an optional, untyped parameter.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = Some(param_type);
        self
    }

    pub fn with_enum<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Fill defaults and check required parameters on `input`.
///
/// Every parameter is checked before returning, so the error names all
/// missing parameters at once. Values found on the input's predecessors
/// count as present.
pub fn resolve_parameters(
    function: &str,
    parameters: &BTreeMap<String, Parameter>,
    input: &mut Content,
) -> Result<(), KernelError> {
    let mut missing = Vec::new();

    for (key, parameter) in parameters {
        let path = if parameter.name.is_empty() {
            key.as_str()
        } else {
            parameter.name.as_str()
        };

        if !input.has_property(path) {
            if let Some(default) = &parameter.default {
                input.set_property(path, default.clone());
            }
        }

        let Some(value) = input.property(path).filter(|v| !v.is_null()) else {
            if parameter.required {
                missing.push(path.to_string());
            }
            continue;
        };

        if let Some(param_type) = parameter.param_type {
            if !param_type.matches(value) {
                warn!(
                    function,
                    parameter = path,
                    expected = ?param_type,
                    found = value.kind(),
                    "parameter value does not match declared type"
                );
            }
        }
        if !parameter.allowed.is_empty() {
            if let Some(text) = value.as_str() {
                if !parameter.allowed.iter().any(|allowed| allowed == text) {
                    warn!(function, parameter = path, value = text, "parameter value not in enum");
                }
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(KernelError::MissingParameters {
            function: function.to_string(),
            parameters: missing,
        })
    }
}
