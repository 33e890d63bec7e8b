//! Configuration Validation
//!
//! Validates engine configuration at load time. Every problem is collected
//! before failing so an operator sees all of them at once.

use std::fmt;

use crate::directory::Schema;
use crate::dn::DnNormalizer;

/// One invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid configuration for '{}': {} (value: {})",
            self.field, self.message, self.value
        )
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of config validation
pub type ValidationResult<T> = Result<T, Vec<ConfigValidationError>>;

/// Accumulating validator
pub struct ConfigValidator {
    errors: Vec<ConfigValidationError>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn error(&mut self, field: &str, value: impl fmt::Display, message: &str) {
        self.errors.push(ConfigValidationError {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        });
    }

    /// Value must not be blank
    pub fn validate_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, value, "Value cannot be empty");
        }
        self
    }

    /// Value must be a non-empty DN the normalizer accepts
    pub fn validate_dn(
        &mut self,
        field: &str,
        value: &str,
        normalizer: &dyn DnNormalizer,
    ) -> &mut Self {
        match normalizer.normalize(value) {
            Ok(dn) if dn.is_empty() => self.error(field, value, "DN cannot be empty"),
            Ok(_) => {}
            Err(e) => self.error(field, value, &format!("Invalid DN: {}", e)),
        }
        self
    }

    /// Object class must be known to the schema
    pub fn validate_object_class(
        &mut self,
        field: &str,
        name: &str,
        schema: &dyn Schema,
    ) -> &mut Self {
        if schema.find_object_class(name).is_none() {
            self.error(field, name, "Unknown object class");
        }
        self
    }

    /// Attribute type must be known to the schema
    pub fn validate_attribute_type(
        &mut self,
        field: &str,
        name: &str,
        schema: &dyn Schema,
    ) -> &mut Self {
        if schema.find_attribute_type(name).is_none() {
            self.error(field, name, "Unknown attribute type");
        }
        self
    }

    /// Finish validation and return result
    pub fn finish(self) -> ValidationResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Format validation errors for display
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
