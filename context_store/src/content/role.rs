//! Roles a context node can play in a conversation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ContentError;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// No role assigned.
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Instruction to the model.
    System,
    /// Human generated message.
    User,
    /// Model generated message.
    Assistant,
    /// Model asking for a function to be called; the node's name holds the function.
    #[serde(alias = "funcCall")]
    FunctionCall,
    /// Result of a function call.
    #[serde(alias = "funcResponse")]
    FunctionResponse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Empty => "",
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::FunctionCall => "function-call",
            Role::FunctionResponse => "function-response",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Role::Empty)
    }
}

impl FromStr for Role {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Role::Empty),
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "function-call" | "funcCall" => Ok(Role::FunctionCall),
            "function-response" | "funcResponse" => Ok(Role::FunctionResponse),
            other => Err(ContentError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
