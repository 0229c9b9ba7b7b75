// Record validator

use crate::{
    CascadeMode, ConfigError, Record, RuleSet, Validatable, ValidationFailure, ValidationResult,
    ValidatorError,
};
use rulecheck_log::debug;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Collects rule sets and checks the configuration once, in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    rule_sets: Vec<RuleSet>,
    known_fields: Option<Vec<String>>,
    cascade: CascadeMode,
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder restricted to the fields of `T`.
    pub fn for_type<T: Validatable>() -> Self {
        Self::new().known_fields(T::FIELDS.iter().copied())
    }

    /// Restrict rule sets to these field names.
    pub fn known_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Cascade mode for rule sets that do not set their own.
    pub fn cascade(mut self, mode: CascadeMode) -> Self {
        self.cascade = mode;
        self
    }

    /// Add rules for a field
    pub fn field(mut self, rules: RuleSet) -> Self {
        self.rule_sets.push(rules);
        self
    }

    /// Check the configuration and freeze it.
    ///
    /// Fails on the first empty or duplicate field name, field outside the
    /// known fields, inverted length bounds, invalid pattern, or modifier
    /// applied before any rule.
    pub fn build(self) -> Result<Validator, ConfigError> {
        let mut seen = HashSet::new();

        for rule_set in &self.rule_sets {
            rule_set.validate_config()?;

            if let Some(known) = &self.known_fields {
                if !known.iter().any(|field| field == rule_set.field()) {
                    return Err(ConfigError::UnknownField {
                        field: rule_set.field().to_string(),
                    });
                }
            }

            if !seen.insert(rule_set.field()) {
                return Err(ConfigError::DuplicateField(rule_set.field().to_string()));
            }

            debug!(
                "Registered {} rule(s) for field '{}'",
                rule_set.rules().len(),
                rule_set.field()
            );
        }

        debug!(
            "Validator built with {} field(s), cascade {:?}",
            self.rule_sets.len(),
            self.cascade
        );

        Ok(Validator {
            inner: Arc::new(ValidatorInner {
                rule_sets: self.rule_sets,
                cascade: self.cascade,
            }),
        })
    }
}

#[derive(Debug)]
struct ValidatorInner {
    rule_sets: Vec<RuleSet>,
    cascade: CascadeMode,
}

/// Immutable set of rule sets. Cloning shares the configuration.
///
/// ```
/// use rulecheck_validation::{Record, RuleSet, Validator};
///
/// let validator = Validator::builder()
///     .field(RuleSet::for_field("Title").not_empty().length_between(3, 100))
///     .build()
///     .unwrap();
///
/// let result = validator
///     .validate(&Record::new().with("Title", ""))
///     .unwrap();
/// assert!(!result.is_valid());
/// assert_eq!(result.failures()[0].field(), "Title");
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    inner: Arc<ValidatorInner>,
}

impl Validator {
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::new()
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.inner.rule_sets
    }

    pub fn cascade_mode(&self) -> CascadeMode {
        self.inner.cascade
    }

    /// Run every rule set against `record`.
    ///
    /// Failures come back in field-registration order, then rule order. An
    /// `Err` means a predicate failed or panicked, not that the record is invalid.
    pub fn validate(&self, record: &Record) -> Result<ValidationResult, ValidatorError> {
        let mut failures = Vec::new();

        for rule_set in &self.inner.rule_sets {
            failures.extend(rule_set.evaluate(record, self.inner.cascade)?);
        }

        debug!(
            "Validated record against {} field(s): {} failure(s)",
            self.inner.rule_sets.len(),
            failures.len()
        );

        Ok(ValidationResult::new(failures))
    }

    /// Validate a typed value through its record form.
    pub fn validate_value<T: Validatable>(
        &self,
        value: &T,
    ) -> Result<ValidationResult, ValidatorError> {
        self.validate(&value.to_record())
    }

    /// Like [`validate`](Self::validate), but an invalid record is returned as
    /// [`ValidatorError::Invalid`].
    pub fn validate_and_throw(&self, record: &Record) -> Result<(), ValidatorError> {
        self.validate(record)?.into_result()?;
        Ok(())
    }

    /// Validate each field in its own task.
    ///
    /// Returns the same failures, in the same order, as [`validate`](Self::validate).
    /// The first predicate fault aborts the remaining tasks.
    pub async fn validate_parallel(
        &self,
        record: &Record,
    ) -> Result<ValidationResult, ValidatorError> {
        let record = Arc::new(record.clone());
        let field_count = self.inner.rule_sets.len();
        let mut set = JoinSet::new();

        for index in 0..field_count {
            let inner = Arc::clone(&self.inner);
            let record = Arc::clone(&record);

            set.spawn(async move {
                let outcome = inner.rule_sets[index].evaluate(&record, inner.cascade);
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Vec<ValidationFailure>>> = vec![None; field_count];
        while let Some(joined) = set.join_next().await {
            let (index, outcome) = joined?;
            slots[index] = Some(outcome?);
        }

        let failures: Vec<ValidationFailure> = slots.into_iter().flatten().flatten().collect();

        debug!(
            "Validated record in parallel across {} field(s): {} failure(s)",
            field_count,
            failures.len()
        );

        Ok(ValidationResult::new(failures))
    }
}
