//! Field paths parsed from `{variable}` placeholder bodies.

use std::fmt;

use crate::domain::BuiltinProperty;

use super::error::ResolveError;

/// Dotted path through a record and its references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// A built-in record property; never traversed.
    Builtin(BuiltinProperty),
    /// Field names, outermost first. Never empty.
    Fields(Vec<String>),
}

impl FieldPath {
    pub fn parse(token: &str) -> Result<Self, ResolveError> {
        let trimmed = token.trim();
        let segments: Vec<&str> = trimmed.split('.').collect();

        if trimmed.is_empty() || segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(ResolveError::malformed(token, "empty path segment"));
        }

        if let Ok(property) = segments[0].trim().parse::<BuiltinProperty>() {
            if segments.len() > 1 {
                return Err(ResolveError::malformed(
                    token,
                    format!("built-in property `{property}` cannot be traversed"),
                ));
            }
            return Ok(Self::Builtin(property));
        }

        Ok(Self::Fields(
            segments
                .into_iter()
                .map(|segment| segment.trim().to_string())
                .collect(),
        ))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(property) => write!(f, "{property}"),
            Self::Fields(segments) => f.write_str(&segments.join(".")),
        }
    }
}
