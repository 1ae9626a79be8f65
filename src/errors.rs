//! Unified error types and result handling.
//!
//! Validation failures carry every violated rule at once so callers can
//! surface the complete list in a single response.

use std::fmt;
use thiserror::Error;

/// A single violated validation rule, keyed by the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field the rule applies to (e.g. `"start_hour"`, `"base"`)
    pub field: &'static str,
    /// Human-readable description of the violation
    pub message: String,
}

/// Ordered collection of validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Creates an empty error list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a violation for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Returns true when no rule was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over recorded violations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages recorded against a single field.
    #[must_use]
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Converts the collected violations into a `Result`, failing when any exist.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { errors: self })
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| {
                if e.field == "base" {
                    e.message.clone()
                } else {
                    format!("{} {}", e.field, e.message)
                }
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Errors surfaced by the habit-wrap core.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed one or more validation rules
    #[error("Validation failed: {errors}")]
    Validation {
        /// Every violated rule
        errors: ValidationErrors,
    },

    /// Referenced record does not exist or belongs to another user
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Requested identifier
        id: i64,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Unknown IANA timezone name
    #[error("Unknown timezone: {name}")]
    Timezone {
        /// The rejected name
        name: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Stored JSON configuration could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_validation_errors_collects_all_rules() {
        let mut errors = ValidationErrors::new();
        errors.add("start_hour", "must be less than or equal to 23.5");
        errors.add("end_hour", "must be after start hour");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.on("end_hour"), vec!["must be after start hour"]);
        assert_eq!(
            errors.to_string(),
            "start_hour must be less than or equal to 23.5; end_hour must be after start hour"
        );
    }

    #[test]
    fn test_base_errors_render_without_field_prefix() {
        let mut errors = ValidationErrors::new();
        errors.add("base", "Work end hour must be after start hour");
        let err = errors.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Work end hour must be after start hour"
        );
    }

    #[test]
    fn test_empty_validation_errors_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
