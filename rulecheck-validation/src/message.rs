// Message template formatting
//
// Templates use `{Token}` placeholders. Substitution is a single left-to-right
// pass: replaced text is never rescanned, tokens without an argument are kept
// verbatim, and there is no escape syntax.

use crate::FieldValue;
use std::collections::HashMap;

/// Placeholder names understood by the built-in templates.
pub mod tokens {
    pub const PROPERTY_NAME: &str = "PropertyName";
    pub const PROPERTY_VALUE: &str = "PropertyValue";
    pub const MIN_LENGTH: &str = "MinLength";
    pub const MAX_LENGTH: &str = "MaxLength";
    pub const TOTAL_LENGTH: &str = "TotalLength";
    pub const RULE_NAME: &str = "RuleName";
}

/// Collects placeholder arguments and renders templates with them.
///
/// ```
/// use rulecheck_validation::MessageFormatter;
///
/// let message = MessageFormatter::new()
///     .append_property_name("Title")
///     .append_argument("MinLength", 3)
///     .append_argument("MaxLength", 100)
///     .format("{PropertyName} must be between {MinLength} and {MaxLength}");
/// assert_eq!(message, "Title must be between 3 and 100");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    arguments: HashMap<String, String>,
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a placeholder argument.
    pub fn append_argument(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.arguments.insert(name.into(), value.to_string());
        self
    }

    pub fn append_property_name(self, name: impl Into<String>) -> Self {
        let name: String = name.into();
        self.append_argument(tokens::PROPERTY_NAME, name)
    }

    pub fn append_property_value(self, value: &FieldValue) -> Self {
        self.append_argument(tokens::PROPERTY_VALUE, value)
    }

    /// Argument currently bound to `name`.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// Render `template` with the collected arguments.
    pub fn format(&self, template: &str) -> String {
        substitute(template, |token| self.argument(token))
    }
}

/// Render `template` against a plain map of arguments.
///
/// Entries of `context` that the template never mentions are ignored.
pub fn format<S: std::hash::BuildHasher>(
    template: &str,
    context: &HashMap<String, String, S>,
) -> String {
    substitute(template, |token| context.get(token).map(String::as_str))
}

fn substitute<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let token = &after[..end];
                match lookup(token) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            // Another `{` opens before this one closes
            Some(end) => {
                out.push('{');
                out.push_str(&after[..end]);
                rest = &after[end..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
