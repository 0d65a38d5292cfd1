//! Function paths of the form `skill.function`.

use std::str::FromStr;

use crate::error::KernelError;

/// Address of a function inside the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionPath {
    pub skill: String,
    pub function: String,
}

impl FunctionPath {
    pub fn new(skill: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            function: function.into(),
        }
    }
}

impl FromStr for FunctionPath {
    type Err = KernelError;

    /// Exactly one `.` with a non-empty name on each side.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        match path.split_once('.') {
            Some((skill, function)) if !skill.is_empty() && !function.is_empty() && !function.contains('.') => {
                Ok(Self::new(skill, function))
            }
            _ => Err(KernelError::InvalidPath(path.to_string())),
        }
    }
}

impl std::fmt::Display for FunctionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.skill, self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let path: FunctionPath = "fun.joke".parse().unwrap();
        assert_eq!(path, FunctionPath::new("fun", "joke"));
        assert_eq!(path.to_string(), "fun.joke");
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["badformat", "a.b.c", ".joke", "fun.", ""] {
            let err = path.parse::<FunctionPath>().unwrap_err();
            assert!(matches!(err, KernelError::InvalidPath(p) if p == path), "{}", path);
        }
    }
}
