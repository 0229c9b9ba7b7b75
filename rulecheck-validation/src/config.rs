// Declarative rule configuration loaded from JSON or TOML files

use crate::errors::BoxError;
use crate::validators::PredicateFn;
use crate::{CascadeMode, ConfigError, FieldValue, Result, Rule, RuleSet, Validator, ValidatorBuilder};
use rulecheck_log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Validator described as data.
///
/// ```toml
/// cascade = "continue"
/// known_fields = ["Title", "DateOfBirth"]
///
/// [[fields]]
/// name = "Title"
/// rules = [
///     { rule = "not_empty" },
///     { rule = "length", min = 3, max = 100, message = "{PropertyName} must be between {MinLength} and {MaxLength}" },
/// ]
///
/// [[fields]]
/// name = "DateOfBirth"
/// display_name = "Date of birth"
/// rules = [{ rule = "must", predicate = "adult", when_present = "DateOfBirth" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub cascade: CascadeMode,
    #[serde(default)]
    pub known_fields: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub cascade: Option<CascadeMode>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Message template override
    #[serde(default)]
    pub message: Option<String>,
    /// Only run the rule when this field has a non-null value
    #[serde(default)]
    pub when_present: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleKind {
    NotEmpty,
    Length { min: usize, max: usize },
    MinLength { min: usize },
    MaxLength { max: usize },
    Email,
    Matches { pattern: String },
    /// Predicate looked up by name in a [`PredicateRegistry`]
    Must { predicate: String },
}

/// Named predicates that `must` rules in a file can refer to.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.register_fallible(name, move |value: &FieldValue| {
            Ok::<_, BoxError>(predicate(value))
        })
    }

    pub fn register_fallible<F, E>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> std::result::Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let predicate: PredicateFn = Arc::new(
            move |value: &FieldValue| -> std::result::Result<bool, BoxError> {
                predicate(value).map_err(Into::into)
            },
        );
        self.predicates.insert(name.into(), predicate);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    fn rule(&self, field: &str, name: &str) -> Result<Rule> {
        let predicate = self
            .predicates
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPredicate {
                field: field.to_string(),
                name: name.to_string(),
            })?;

        Ok(Rule::try_must_satisfy(move |value| predicate(value)).with_name(name))
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("PredicateRegistry")
            .field("predicates", &names)
            .finish()
    }
}

impl RuleConfig {
    fn to_rule(&self, field: &str, registry: &PredicateRegistry) -> Result<Rule> {
        let mut rule = match &self.kind {
            RuleKind::NotEmpty => Rule::not_empty(),
            RuleKind::Length { min, max } => Rule::length_between(*min, *max),
            RuleKind::MinLength { min } => Rule::min_length(*min),
            RuleKind::MaxLength { max } => Rule::max_length(*max),
            RuleKind::Email => Rule::email(),
            RuleKind::Matches { pattern } => Rule::matches(pattern.as_str()),
            RuleKind::Must { predicate } => registry.rule(field, predicate)?,
        };

        if let Some(message) = &self.message {
            rule = rule.with_message(message.as_str());
        }
        if let Some(guard_field) = &self.when_present {
            rule = rule.when_present(guard_field.as_str());
        }

        Ok(rule)
    }
}

impl FieldConfig {
    fn to_rule_set(&self, registry: &PredicateRegistry) -> Result<RuleSet> {
        let mut rule_set = RuleSet::for_field(self.name.as_str());

        if let Some(display_name) = &self.display_name {
            rule_set = rule_set.with_display_name(display_name.as_str());
        }
        if let Some(cascade) = self.cascade {
            rule_set = rule_set.cascade(cascade);
        }

        for rule in &self.rules {
            rule_set = rule_set.rule(rule.to_rule(&self.name, registry)?);
        }

        Ok(rule_set)
    }
}

impl ValidatorBuilder {
    /// Builder populated from a configuration. Bounds and patterns are checked
    /// later by [`build`](Self::build); unknown predicate names fail here.
    pub fn from_config(config: &ValidatorConfig, registry: &PredicateRegistry) -> Result<Self> {
        let mut builder = ValidatorBuilder::new().cascade(config.cascade);

        if let Some(known) = &config.known_fields {
            builder = builder.known_fields(known.iter().cloned());
        }

        for field in &config.fields {
            builder = builder.field(field.to_rule_set(registry)?);
        }

        Ok(builder)
    }
}

impl Validator {
    /// Load, translate and build in one step.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        registry: &PredicateRegistry,
    ) -> Result<Self> {
        let config = ConfigLoader::auto(path.as_ref())?.load_file(path.as_ref())?;
        ValidatorBuilder::from_config(&config, registry)?.build()
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::Load("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::Load(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ValidatorConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        debug!("Loaded validator configuration from {}", path.display());
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<ValidatorConfig> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e))),
        }
    }
}
