// Rules and per-field rule sets

use crate::errors::BoxError;
use crate::message::tokens;
use crate::validators::{Check, Length, Matches, PredicateFn, catch_panic};
use crate::{
    ConfigError, FieldValue, MessageFormatter, Record, ValidationFailure, ValidatorError,
};
use rulecheck_log::{error, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type GuardFn = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

fn predicate_fn<F>(predicate: F) -> PredicateFn
where
    F: Fn(&FieldValue) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    Arc::new(predicate)
}

fn guard_fn<F>(guard: F) -> GuardFn
where
    F: Fn(&Record) -> bool + Send + Sync + 'static,
{
    Arc::new(guard)
}

/// What happens after a rule of a field fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Keep evaluating the field's remaining rules.
    #[default]
    Continue,
    /// Skip the field's remaining rules.
    Stop,
}

/// A single check against one field's value.
#[derive(Clone)]
pub struct Rule {
    name: Option<String>,
    check: Check,
    message: Option<String>,
    guard: Option<GuardFn>,
}

impl Rule {
    fn from_check(check: Check) -> Self {
        Self {
            name: None,
            check,
            message: None,
            guard: None,
        }
    }

    /// Value must not be null, blank text, or an empty list.
    pub fn not_empty() -> Self {
        Self::from_check(Check::NotEmpty)
    }

    /// Length must lie in `min..=max`. A null value has length 0.
    pub fn length_between(min: usize, max: usize) -> Self {
        Self::from_check(Check::Length(Length::between(min, max)))
    }

    pub fn min_length(min: usize) -> Self {
        Self::from_check(Check::Length(Length::at_least(min)))
    }

    pub fn max_length(max: usize) -> Self {
        Self::from_check(Check::Length(Length::at_most(max)))
    }

    pub fn email() -> Self {
        Self::from_check(Check::Email)
    }

    /// Value's text form must match `pattern`. An invalid pattern is a
    /// configuration error reported by [`ValidatorBuilder::build`](crate::ValidatorBuilder::build).
    pub fn matches(pattern: impl Into<String>) -> Self {
        Self::from_check(Check::Matches(Matches::new(pattern)))
    }

    /// Custom predicate. Must be pure.
    pub fn must_satisfy<F>(predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        Self::from_check(Check::Predicate(predicate_fn(move |value| {
            Ok(predicate(value))
        })))
    }

    /// Custom predicate that can fail. An `Err` is not a validation failure:
    /// it aborts validation with [`ValidatorError::PredicateFault`].
    pub fn try_must_satisfy<F, E>(predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::from_check(Check::Predicate(predicate_fn(move |value| {
            predicate(value).map_err(Into::into)
        })))
    }

    /// Override the message template.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    /// Override the rule name reported in failures.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only run when `guard` holds for the record. Guards accumulate: every
    /// attached guard must hold.
    pub fn when<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(match self.guard.take() {
            Some(previous) => guard_fn(move |record| previous(record) && guard(record)),
            None => guard_fn(guard),
        });
        self
    }

    /// Only run when `guard` does not hold.
    pub fn unless<F>(self, guard: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.when(move |record| !guard(record))
    }

    /// Only run when `field` carries a non-null value.
    pub fn when_present(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.when(move |record| record.has_value(&field))
    }

    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.check.default_name())
    }

    pub fn message_template(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.check.default_message())
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    fn validate_config(&self, field: &str) -> Result<(), ConfigError> {
        match &self.check {
            Check::Length(length) if !length.is_well_formed() => Err(ConfigError::InvalidBounds {
                field: field.to_string(),
                min: length.min,
                max: length.max.unwrap_or_default(),
            }),
            Check::Matches(matches) => match matches.compile_error() {
                Some(reason) => Err(ConfigError::InvalidPattern {
                    field: field.to_string(),
                    pattern: matches.pattern().to_string(),
                    reason: reason.to_string(),
                }),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Evaluate against `record`, reading the value of `field`.
    ///
    /// `Ok(None)` when the rule passes or its guard skips it.
    pub fn evaluate(
        &self,
        field: &str,
        display_name: &str,
        record: &Record,
    ) -> Result<Option<ValidationFailure>, ValidatorError> {
        if let Some(guard) = &self.guard {
            let applies = catch_panic(|| guard(record))
                .map_err(|source| self.fault(field, "Guard", source))?;
            if !applies {
                trace!("Guard skipped rule '{}' on '{}'", self.name(), field);
                return Ok(None);
            }
        }

        let value = record.get(field);
        let passed = self
            .check
            .run(value)
            .map_err(|source| self.fault(field, "Predicate", source))?;

        if passed {
            return Ok(None);
        }

        let formatter = MessageFormatter::new()
            .append_property_name(display_name)
            .append_property_value(value)
            .append_argument(tokens::RULE_NAME, self.name());
        let message = self
            .check
            .arguments(formatter, value)
            .format(self.message_template());

        Ok(Some(ValidationFailure::new(
            field,
            self.name(),
            message,
            value.clone(),
        )))
    }
}

impl Rule {
    fn fault(&self, field: &str, stage: &str, source: BoxError) -> ValidatorError {
        error!(
            "{} of rule '{}' on '{}' failed: {}",
            stage,
            self.name(),
            field,
            source
        );
        ValidatorError::PredicateFault {
            field: field.to_string(),
            rule: self.name().to_string(),
            source,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name())
            .field("check", &self.check)
            .field("message", &self.message_template())
            .field("guarded", &self.has_guard())
            .finish()
    }
}

/// Ordered rules for one field.
///
/// Modifiers such as [`with_message`](Self::with_message) and
/// [`when`](Self::when) apply to the most recently added rule.
///
/// ```
/// use rulecheck_validation::RuleSet;
///
/// let title = RuleSet::for_field("Title")
///     .not_empty()
///     .length_between(3, 100)
///     .with_message("{PropertyName} must be between {MinLength} and {MaxLength}");
/// assert_eq!(title.rules().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct RuleSet {
    field: String,
    display_name: Option<String>,
    rules: Vec<Rule>,
    cascade: Option<CascadeMode>,
    dangling: Option<&'static str>,
}

impl RuleSet {
    /// Create an empty rule set for a field
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            display_name: None,
            rules: Vec::new(),
            cascade: None,
            dangling: None,
        }
    }

    /// Append a rule
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn not_empty(self) -> Self {
        self.rule(Rule::not_empty())
    }

    pub fn length_between(self, min: usize, max: usize) -> Self {
        self.rule(Rule::length_between(min, max))
    }

    pub fn min_length(self, min: usize) -> Self {
        self.rule(Rule::min_length(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::max_length(max))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::email())
    }

    pub fn matches(self, pattern: impl Into<String>) -> Self {
        self.rule(Rule::matches(pattern))
    }

    pub fn must_satisfy<F>(self, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::must_satisfy(predicate))
    }

    pub fn try_must_satisfy<F, E>(self, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.rule(Rule::try_must_satisfy(predicate))
    }

    fn modify_last(mut self, modifier: &'static str, apply: impl FnOnce(Rule) -> Rule) -> Self {
        match self.rules.pop() {
            Some(rule) => self.rules.push(apply(rule)),
            None => self.dangling = self.dangling.or(Some(modifier)),
        }
        self
    }

    pub fn with_message(self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.modify_last("with_message", |rule| rule.with_message(template))
    }

    pub fn with_rule_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.modify_last("with_rule_name", |rule| rule.with_name(name))
    }

    pub fn when<F>(self, guard: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.modify_last("when", |rule| rule.when(guard))
    }

    pub fn unless<F>(self, guard: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.modify_last("unless", |rule| rule.unless(guard))
    }

    pub fn when_present(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.modify_last("when_present", |rule| rule.when_present(field))
    }

    /// Guard every rule added so far.
    pub fn when_all<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        if self.rules.is_empty() {
            self.dangling = self.dangling.or(Some("when_all"));
            return self;
        }
        let guard = guard_fn(guard);
        self.rules = self
            .rules
            .into_iter()
            .map(|rule| {
                let guard = Arc::clone(&guard);
                rule.when(move |record| guard(record))
            })
            .collect();
        self
    }

    /// Name used for `{PropertyName}` instead of the field name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Override the validator's cascade mode for this field.
    pub fn cascade(mut self, mode: CascadeMode) -> Self {
        self.cascade = Some(mode);
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.field)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn cascade_mode(&self) -> Option<CascadeMode> {
        self.cascade
    }

    pub(crate) fn validate_config(&self) -> Result<(), ConfigError> {
        if self.field.trim().is_empty() {
            return Err(ConfigError::EmptyFieldName);
        }
        if let Some(modifier) = self.dangling {
            return Err(ConfigError::DanglingModifier {
                field: self.field.clone(),
                modifier,
            });
        }
        self.rules
            .iter()
            .try_for_each(|rule| rule.validate_config(&self.field))
    }

    /// Evaluate all rules in declaration order.
    ///
    /// `default_cascade` applies when the set has no mode of its own.
    pub fn evaluate(
        &self,
        record: &Record,
        default_cascade: CascadeMode,
    ) -> Result<Vec<ValidationFailure>, ValidatorError> {
        let cascade = self.cascade.unwrap_or(default_cascade);
        let mut failures = Vec::new();

        for rule in &self.rules {
            if let Some(failure) = rule.evaluate(&self.field, self.display_name(), record)? {
                failures.push(failure);
                if cascade == CascadeMode::Stop {
                    break;
                }
            }
        }

        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_passes_and_fails() {
        let rule = Rule::not_empty();
        let record = Record::new().with("Title", "Rust");
        assert!(rule.evaluate("Title", "Title", &record).unwrap().is_none());

        let failure = rule
            .evaluate("Body", "Body", &record)
            .unwrap()
            .expect("missing field is empty");
        assert_eq!(failure.field(), "Body");
        assert_eq!(failure.rule(), "not_empty");
        assert_eq!(failure.message(), "'Body' must not be empty.");
    }

    #[test]
    fn test_false_guard_skips_rule() {
        let rule = Rule::must_satisfy(|_| false).when(|_| false);
        let record = Record::new().with("Age", 3);
        assert!(rule.evaluate("Age", "Age", &record).unwrap().is_none());
    }

    #[test]
    fn test_guards_accumulate() {
        let rule = Rule::not_empty()
            .when(|record| record.has_value("A"))
            .when(|record| record.has_value("B"));

        let only_a = Record::new().with("A", 1);
        assert!(rule.evaluate("X", "X", &only_a).unwrap().is_none());

        let both = Record::new().with("A", 1).with("B", 2);
        assert!(rule.evaluate("X", "X", &both).unwrap().is_some());
    }

    #[test]
    fn test_unless_inverts_guard() {
        let rule = Rule::not_empty().unless(|record| record.has_value("Draft"));
        let draft = Record::new().with("Draft", true);
        assert!(rule.evaluate("Title", "Title", &draft).unwrap().is_none());
        assert!(rule.evaluate("Title", "Title", &Record::new()).unwrap().is_some());
    }

    #[test]
    fn test_custom_message_and_name() {
        let rule = Rule::length_between(3, 10)
            .with_message("{PropertyName} needs {MinLength}-{MaxLength}, got {TotalLength}")
            .with_name("title_length");
        let record = Record::new().with("Title", "ab");
        let failure = rule.evaluate("Title", "Book title", &record).unwrap().unwrap();
        assert_eq!(failure.message(), "Book title needs 3-10, got 2");
        assert_eq!(failure.rule(), "title_length");
    }

    #[test]
    fn test_default_length_message() {
        let record = Record::new().with("Title", "ab");
        let failure = Rule::length_between(3, 100)
            .evaluate("Title", "Title", &record)
            .unwrap()
            .unwrap();
        assert_eq!(
            failure.message(),
            "'Title' must be between 3 and 100 characters. You entered 2 characters."
        );
    }

    #[test]
    fn test_property_value_in_message() {
        let rule = Rule::email().with_message("'{PropertyValue}' is not an address");
        let record = Record::new().with("Email", "nope");
        let failure = rule.evaluate("Email", "Email", &record).unwrap().unwrap();
        assert_eq!(failure.message(), "'nope' is not an address");
        assert_eq!(failure.attempted_value(), &FieldValue::from("nope"));
    }

    #[test]
    fn test_predicate_fault_is_not_a_failure() {
        let rule = Rule::try_must_satisfy(|_| Err::<bool, _>("backend down")).with_name("unique");
        let err = rule
            .evaluate("Email", "Email", &Record::new())
            .unwrap_err();
        match err {
            ValidatorError::PredicateFault { field, rule, source } => {
                assert_eq!(field, "Email");
                assert_eq!(rule, "unique");
                assert_eq!(source.to_string(), "backend down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panicking_guard_is_a_fault() {
        let rule = Rule::not_empty()
            .when(|record| record.get("Country").as_str().unwrap() == "NL")
            .with_name("postcode");
        let err = rule
            .evaluate("Postcode", "Postcode", &Record::new())
            .unwrap_err();
        match err {
            ValidatorError::PredicateFault { field, rule, source } => {
                assert_eq!(field, "Postcode");
                assert_eq!(rule, "postcode");
                assert!(source.is::<crate::PredicatePanic>());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rule_set_collects_all_failures() {
        let rules = RuleSet::for_field("Title").not_empty().length_between(3, 100);
        let failures = rules
            .evaluate(&Record::new().with("Title", ""), CascadeMode::Continue)
            .unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].rule(), "not_empty");
        assert_eq!(failures[1].rule(), "length");
    }

    #[test]
    fn test_rule_set_stop_cascade() {
        let rules = RuleSet::for_field("Title")
            .not_empty()
            .length_between(3, 100)
            .cascade(CascadeMode::Stop);
        let failures = rules
            .evaluate(&Record::new().with("Title", ""), CascadeMode::Continue)
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule(), "not_empty");
    }

    #[test]
    fn test_modifiers_apply_to_last_rule() {
        let rules = RuleSet::for_field("Title")
            .not_empty()
            .length_between(3, 100)
            .with_message("too short");
        assert_eq!(rules.rules()[0].message_template(), "'{PropertyName}' must not be empty.");
        assert_eq!(rules.rules()[1].message_template(), "too short");
    }

    #[test]
    fn test_when_all_guards_every_rule() {
        let rules = RuleSet::for_field("Nickname")
            .not_empty()
            .min_length(2)
            .when_all(|record| record.has_value("WantsNickname"));
        assert!(rules.rules().iter().all(Rule::has_guard));
        let failures = rules.evaluate(&Record::new(), CascadeMode::Continue).unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn test_display_name() {
        let rules = RuleSet::for_field("dob").with_display_name("Date of birth").not_empty();
        let failures = rules.evaluate(&Record::new(), CascadeMode::Continue).unwrap();
        assert_eq!(failures[0].field(), "dob");
        assert_eq!(failures[0].message(), "'Date of birth' must not be empty.");
    }

    #[test]
    fn test_config_checks() {
        assert!(matches!(
            RuleSet::for_field("Title").length_between(10, 2).validate_config(),
            Err(ConfigError::InvalidBounds { min: 10, max: 2, .. })
        ));
        assert!(matches!(
            RuleSet::for_field("Code").matches("[").validate_config(),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            RuleSet::for_field("  ").not_empty().validate_config(),
            Err(ConfigError::EmptyFieldName)
        ));
        assert!(matches!(
            RuleSet::for_field("Title").with_message("orphan").validate_config(),
            Err(ConfigError::DanglingModifier { modifier: "with_message", .. })
        ));
        assert!(RuleSet::for_field("Title").not_empty().validate_config().is_ok());
    }
}
