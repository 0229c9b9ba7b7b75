// Validation outcomes and error types

use crate::FieldValue;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed rule: which field, what message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    field: String,
    message: String,
    rule: String,
    value: FieldValue,
}

impl ValidationFailure {
    pub(crate) fn new(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
        value: FieldValue,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: rule.into(),
            value,
        }
    }

    /// Field the failing rule was registered for.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Formatted message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the rule that failed, e.g. `not_empty`.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// The value the rule rejected.
    pub fn attempted_value(&self) -> &FieldValue {
        &self.value
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    pub(crate) fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    /// True iff there are no failures.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures in field-registration order, then rule order.
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Failures for a single field.
    pub fn failures_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a ValidationFailure> + 'a {
        self.failures.iter().filter(move |f| f.field == field)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }

    /// `Ok(())` when valid, otherwise the failures as an error.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationErrors::new(self.failures))
        }
    }

    /// Response body for a 4xx reply: `{"valid": bool, "errors": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": self.is_valid(),
            "errors": failures_json(&self.failures),
        })
    }
}

fn failures_json(failures: &[ValidationFailure]) -> Vec<serde_json::Value> {
    failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "field": f.field,
                "message": f.message,
                "rule": f.rule,
                "value": f.value,
            })
        })
        .collect()
}

/// Failures of an invalid record, as an error value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationFailure>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationFailure>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationFailure> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "errors": failures_json(&self.errors) })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed:")?;
        for error in &self.errors {
            writeln!(f, " -- {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Raised while building a validator. Never produced during evaluation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Rule set registered with an empty field name")]
    EmptyFieldName,

    #[error("Field '{0}' has more than one rule set")]
    DuplicateField(String),

    #[error("Field '{field}' is not a field of the record type")]
    UnknownField { field: String },

    #[error("Invalid length bounds on '{field}': min {min} is greater than max {max}")]
    InvalidBounds {
        field: String,
        min: usize,
        max: usize,
    },

    #[error("Invalid pattern '{pattern}' on '{field}': {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("'{modifier}' on '{field}' was applied before any rule")]
    DanglingModifier {
        field: String,
        modifier: &'static str,
    },

    #[error("No predicate named '{name}' is registered (field '{field}')")]
    UnknownPredicate { field: String, name: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// A predicate panicked instead of returning.
#[derive(Debug, Error)]
#[error("predicate panicked: {0}")]
pub struct PredicatePanic(pub String);

/// Raised while validating a record.
///
/// Invalid input is not an error of `validate`; it is reported in the
/// [`ValidationResult`]. These variants mean the rule configuration is broken.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Predicate of rule '{rule}' on field '{field}' failed: {source}")]
    PredicateFault {
        field: String,
        rule: String,
        source: BoxError,
    },

    #[error("Validation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Only returned by [`Validator::validate_and_throw`](crate::Validator::validate_and_throw).
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(field: &str) -> ValidationFailure {
        ValidationFailure::new(field, "not_empty", "must not be empty", FieldValue::Null)
    }

    #[test]
    fn test_result_validity() {
        assert!(ValidationResult::default().is_valid());
        assert!(!ValidationResult::new(vec![failure("Title")]).is_valid());
    }

    #[test]
    fn test_failures_for_field() {
        let result =
            ValidationResult::new(vec![failure("Title"), failure("Body"), failure("Title")]);
        assert_eq!(result.failures_for("Title").count(), 2);
        assert_eq!(result.failures_for("Missing").count(), 0);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::default().into_result().is_ok());
        let errors = ValidationResult::new(vec![failure("Title")])
            .into_result()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get_field_errors("Title").len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let json = ValidationResult::new(vec![failure("Title")]).to_json();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["field"], "Title");
        assert_eq!(json["errors"][0]["rule"], "not_empty");
        assert!(json["errors"][0]["value"].is_null());
    }

    #[test]
    fn test_errors_display() {
        let errors = ValidationErrors::new(vec![failure("Title")]);
        assert_eq!(
            errors.to_string(),
            "Validation failed:\n -- Title: must not be empty\n"
        );
    }

    #[test]
    fn test_predicate_fault_message() {
        let err = ValidatorError::PredicateFault {
            field: "Age".into(),
            rule: "adult".into(),
            source: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "Predicate of rule 'adult' on field 'Age' failed: boom"
        );
    }
}
