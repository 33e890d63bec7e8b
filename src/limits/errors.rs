//! Compile Errors
//!
//! Error types raised while turning policy directives into rules.
//! Every variant is fatal to the directive that produced it.

use thiserror::Error;

use crate::rules::PatternStyle;

/// Result type for directive compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Integer outside the `-1..=u32::MAX` range of a limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("limit value {0} is out of range")]
pub struct LimitValueError(pub i64);

/// Directive compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("missing arg(s) in \"{directive} <pattern> <limits>\" directive")]
    MissingArguments { directive: String },

    #[error("unknown directive \"{token}\"")]
    UnknownDirective { token: String },

    #[error("unknown pattern \"{token}\"")]
    UnknownPattern { token: String },

    #[error("missing '=' in pattern \"{token}\"")]
    MissingEquals { token: String },

    #[error("unknown scope in pattern \"{token}\"")]
    UnknownScope { token: String },

    #[error("unknown objectClass \"{name}\" in pattern \"{token}\"")]
    UnknownObjectClass { token: String, name: String },

    #[error("unknown attributeType \"{name}\" in pattern \"{token}\"")]
    UnknownAttributeType { token: String, name: String },

    #[error("invalid DN in pattern \"{token}\": {reason}")]
    InvalidDn { token: String, reason: String },

    #[error("invalid regular expression in pattern \"{token}\": {source}")]
    InvalidRegex {
        token: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown limit values \"{token}\"")]
    InvalidLimit { token: String },

    #[error("a \"{style}\" rule already exists in this table")]
    DuplicateRule { style: PatternStyle },
}

impl CompileError {
    pub(crate) fn invalid_limit(token: &str) -> Self {
        CompileError::InvalidLimit {
            token: token.to_string(),
        }
    }

    /// The directive token that caused the failure, if one is to blame
    pub fn token(&self) -> Option<&str> {
        match self {
            CompileError::MissingArguments { .. } | CompileError::DuplicateRule { .. } => None,
            CompileError::UnknownDirective { token }
            | CompileError::UnknownPattern { token }
            | CompileError::MissingEquals { token }
            | CompileError::UnknownScope { token }
            | CompileError::UnknownObjectClass { token, .. }
            | CompileError::UnknownAttributeType { token, .. }
            | CompileError::InvalidDn { token, .. }
            | CompileError::InvalidRegex { token, .. }
            | CompileError::InvalidLimit { token } => Some(token),
        }
    }

    /// Stable error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MissingArguments { .. } => "MISSING_ARGUMENTS",
            CompileError::UnknownDirective { .. } => "UNKNOWN_DIRECTIVE",
            CompileError::UnknownPattern { .. } => "UNKNOWN_PATTERN",
            CompileError::MissingEquals { .. } => "MISSING_EQUALS",
            CompileError::UnknownScope { .. } => "UNKNOWN_SCOPE",
            CompileError::UnknownObjectClass { .. } => "UNKNOWN_OBJECT_CLASS",
            CompileError::UnknownAttributeType { .. } => "UNKNOWN_ATTRIBUTE_TYPE",
            CompileError::InvalidDn { .. } => "INVALID_DN",
            CompileError::InvalidRegex { .. } => "INVALID_REGEX",
            CompileError::InvalidLimit { .. } => "INVALID_LIMIT",
            CompileError::DuplicateRule { .. } => "DUPLICATE_RULE",
        }
    }
}
