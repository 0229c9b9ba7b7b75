// rulecheck - rule-based field validation
//
// Facade over the workspace crates: the validation engine and the logging
// layer it reports through.

// Re-export the validation engine
#[cfg(feature = "validation")]
pub use rulecheck_validation::*;

#[cfg(feature = "validation")]
pub use rulecheck_validation;

pub use rulecheck_log as log;

// Prelude for common imports
pub mod prelude {
    #[cfg(feature = "validation")]
    pub use rulecheck_validation::{
        CascadeMode, ConfigError, FieldValue, MessageFormatter, PredicateRegistry, Record, Rule,
        RuleSet, Validatable, ValidationFailure, ValidationResult, Validator, ValidatorBuilder,
        ValidatorError,
    };
}
