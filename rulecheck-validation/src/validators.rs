// Built-in checks

use crate::errors::{BoxError, PredicatePanic};
use crate::message::tokens;
use crate::{FieldValue, MessageFormatter};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

pub(crate) type PredicateFn =
    Arc<dyn Fn(&FieldValue) -> Result<bool, BoxError> + Send + Sync>;

/// Fails for `Null`, whitespace-only text and empty lists.
pub struct NotEmpty;

impl NotEmpty {
    pub const NAME: &'static str = "not_empty";
    pub const DEFAULT_MESSAGE: &'static str = "'{PropertyName}' must not be empty.";

    pub fn check(value: &FieldValue) -> bool {
        !value.is_blank()
    }
}

/// Length bounds, inclusive. `Null` has length 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    pub min: usize,
    pub max: Option<usize>,
}

impl Length {
    pub const NAME: &'static str = "length";
    pub const BETWEEN_MESSAGE: &'static str = "'{PropertyName}' must be between {MinLength} and {MaxLength} characters. You entered {TotalLength} characters.";
    pub const MIN_MESSAGE: &'static str = "The length of '{PropertyName}' must be at least {MinLength} characters. You entered {TotalLength} characters.";
    pub const MAX_MESSAGE: &'static str = "The length of '{PropertyName}' must be {MaxLength} characters or fewer. You entered {TotalLength} characters.";

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn at_most(max: usize) -> Self {
        Self { min: 0, max: Some(max) }
    }

    pub fn check(&self, value: &FieldValue) -> bool {
        let len = value.length();
        len >= self.min && self.max.is_none_or(|max| len <= max)
    }

    /// Bounds are usable when there is no upper bound or `min <= max`.
    pub fn is_well_formed(&self) -> bool {
        self.max.is_none_or(|max| self.min <= max)
    }

    fn default_message(&self) -> &'static str {
        match (self.min, self.max) {
            (0, Some(_)) => Self::MAX_MESSAGE,
            (_, Some(_)) => Self::BETWEEN_MESSAGE,
            (_, None) => Self::MIN_MESSAGE,
        }
    }
}

/// Email address format. `Null` passes; pair with `not_empty` to require a value.
pub struct IsEmail;

impl IsEmail {
    pub const NAME: &'static str = "email";
    pub const DEFAULT_MESSAGE: &'static str = "'{PropertyName}' is not a valid email address.";

    pub fn check(value: &FieldValue) -> bool {
        match value {
            FieldValue::Null => true,
            other => EMAIL_REGEX.is_match(&other.to_string()),
        }
    }
}

/// Custom regex. `Null` passes.
#[derive(Debug, Clone)]
pub struct Matches {
    pattern: String,
    compiled: Result<Regex, regex::Error>,
}

impl Matches {
    pub const NAME: &'static str = "matches";
    pub const DEFAULT_MESSAGE: &'static str = "'{PropertyName}' is not in the correct format.";

    /// Compilation errors are kept and reported when the validator is built.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let compiled = Regex::new(&pattern);
        Self { pattern, compiled }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn compile_error(&self) -> Option<&regex::Error> {
        self.compiled.as_ref().err()
    }

    pub fn check(&self, value: &FieldValue) -> bool {
        match (&self.compiled, value) {
            (_, FieldValue::Null) => true,
            (Ok(regex), other) => regex.is_match(&other.to_string()),
            (Err(_), _) => false,
        }
    }
}

/// Default rule name for custom predicates.
pub const PREDICATE_NAME: &str = "predicate";

/// Default message for custom predicates.
pub const PREDICATE_MESSAGE: &str = "The specified condition was not met for '{PropertyName}'.";

/// What a rule checks.
#[derive(Clone)]
pub(crate) enum Check {
    NotEmpty,
    Length(Length),
    Email,
    Matches(Matches),
    Predicate(PredicateFn),
}

impl Check {
    pub(crate) fn default_name(&self) -> &'static str {
        match self {
            Check::NotEmpty => NotEmpty::NAME,
            Check::Length(_) => Length::NAME,
            Check::Email => IsEmail::NAME,
            Check::Matches(_) => Matches::NAME,
            Check::Predicate(_) => PREDICATE_NAME,
        }
    }

    pub(crate) fn default_message(&self) -> &'static str {
        match self {
            Check::NotEmpty => NotEmpty::DEFAULT_MESSAGE,
            Check::Length(length) => length.default_message(),
            Check::Email => IsEmail::DEFAULT_MESSAGE,
            Check::Matches(_) => Matches::DEFAULT_MESSAGE,
            Check::Predicate(_) => PREDICATE_MESSAGE,
        }
    }

    pub(crate) fn run(&self, value: &FieldValue) -> Result<bool, BoxError> {
        Ok(match self {
            Check::NotEmpty => NotEmpty::check(value),
            Check::Length(length) => length.check(value),
            Check::Email => IsEmail::check(value),
            Check::Matches(matches) => matches.check(value),
            Check::Predicate(predicate) => {
                return catch_panic(|| predicate(value)).and_then(std::convert::identity);
            }
        })
    }

    /// Adds the check's own placeholders (bounds, lengths).
    pub(crate) fn arguments(
        &self,
        formatter: MessageFormatter,
        value: &FieldValue,
    ) -> MessageFormatter {
        match self {
            Check::Length(length) => {
                let formatter = formatter
                    .append_argument(tokens::MIN_LENGTH, length.min)
                    .append_argument(tokens::TOTAL_LENGTH, value.length());
                match length.max {
                    Some(max) => formatter.append_argument(tokens::MAX_LENGTH, max),
                    None => formatter,
                }
            }
            _ => formatter,
        }
    }
}

/// Run user code, reporting a panic as [`PredicatePanic`].
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, BoxError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| PredicatePanic(panic_message(payload)).into())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "unknown panic".to_string(), |s| s.to_string()),
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::NotEmpty => f.write_str("NotEmpty"),
            Check::Length(length) => f.debug_tuple("Length").field(length).finish(),
            Check::Email => f.write_str("Email"),
            Check::Matches(matches) => f.debug_tuple("Matches").field(&matches.pattern).finish(),
            Check::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(NotEmpty::check(&"test".into()));
        assert!(!NotEmpty::check(&"".into()));
        assert!(!NotEmpty::check(&"\t\n  \r".into()));
        assert!(!NotEmpty::check(&FieldValue::Null));
        assert!(NotEmpty::check(&FieldValue::Int(0)));
    }

    #[test]
    fn test_length_between_boundaries() {
        let length = Length::between(3, 5);
        assert!(length.check(&"abc".into()));
        assert!(length.check(&"abcde".into()));
        assert!(!length.check(&"ab".into()));
        assert!(!length.check(&"abcdef".into()));
    }

    #[test]
    fn test_length_on_null_is_zero() {
        assert!(!Length::between(3, 100).check(&FieldValue::Null));
        assert!(Length::between(0, 100).check(&FieldValue::Null));
        assert!(Length::at_most(10).check(&FieldValue::Null));
    }

    #[test]
    fn test_length_bounds_well_formed() {
        assert!(Length::between(3, 3).is_well_formed());
        assert!(Length::at_least(50).is_well_formed());
        assert!(!Length::between(10, 2).is_well_formed());
    }

    #[test]
    fn test_length_default_messages() {
        assert_eq!(Length::between(1, 2).default_message(), Length::BETWEEN_MESSAGE);
        assert_eq!(Length::at_least(1).default_message(), Length::MIN_MESSAGE);
        assert_eq!(Length::at_most(2).default_message(), Length::MAX_MESSAGE);
    }

    #[test]
    fn test_email_variations() {
        assert!(IsEmail::check(&"user+tag@example.com".into()));
        assert!(IsEmail::check(&"user.name@example.co.uk".into()));
        assert!(!IsEmail::check(&"@example.com".into()));
        assert!(!IsEmail::check(&"user@".into()));
        assert!(IsEmail::check(&FieldValue::Null));
    }

    #[test]
    fn test_matches() {
        let phone = Matches::new(r"^\d{3}-\d{3}-\d{4}$");
        assert!(phone.compile_error().is_none());
        assert!(phone.check(&"123-456-7890".into()));
        assert!(!phone.check(&"invalid".into()));
    }

    #[test]
    fn test_matches_invalid_pattern() {
        let broken = Matches::new("(unclosed");
        assert!(broken.compile_error().is_some());
        assert!(!broken.check(&"anything".into()));
    }

    #[test]
    fn test_predicate_error_propagates() {
        let check = Check::Predicate(Arc::new(|_: &FieldValue| -> Result<bool, BoxError> {
            Err("lookup failed".into())
        }));
        let err = check.run(&FieldValue::Null).unwrap_err();
        assert_eq!(err.to_string(), "lookup failed");
    }

    #[test]
    fn test_predicate_panic_becomes_error() {
        let check = Check::Predicate(Arc::new(|_: &FieldValue| -> Result<bool, BoxError> {
            panic!("index out of range")
        }));
        let err = check.run(&FieldValue::Null).unwrap_err();
        assert_eq!(err.to_string(), "predicate panicked: index out of range");
    }

    #[test]
    fn test_check_names() {
        let predicate = Check::Predicate(Arc::new(|_: &FieldValue| -> Result<bool, BoxError> {
            Ok(true)
        }));
        assert_eq!(predicate.default_name(), PREDICATE_NAME);
        assert_eq!(predicate.default_message(), PREDICATE_MESSAGE);
        assert_eq!(Check::Email.default_name(), IsEmail::NAME);
    }

    #[test]
    fn test_catch_panic() {
        assert_eq!(catch_panic(|| 7).unwrap(), 7);
        let err = catch_panic(|| -> bool { panic!("{}", String::from("no country")) }).unwrap_err();
        assert_eq!(err.to_string(), "predicate panicked: no country");
    }

    #[test]
    fn test_length_arguments() {
        let formatter = Check::Length(Length::at_least(4))
            .arguments(MessageFormatter::new(), &"abc".into());
        assert_eq!(formatter.argument(tokens::MIN_LENGTH), Some("4"));
        assert_eq!(formatter.argument(tokens::TOTAL_LENGTH), Some("3"));
        assert_eq!(formatter.argument(tokens::MAX_LENGTH), None);
    }
}
