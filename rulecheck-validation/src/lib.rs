//! Rule-based field validation
//!
//! Rules are declared per field at configuration time, checked once when the
//! [`Validator`] is built, and evaluated against [`Record`]s. Every failing
//! rule contributes a [`ValidationFailure`] with a message rendered from its
//! template.
//!
//! # Examples
//!
//! ## Rule sets
//!
//! ```
//! use rulecheck_validation::{Record, RuleSet, Validator};
//!
//! let validator = Validator::builder()
//!     .field(RuleSet::for_field("Title").not_empty().length_between(3, 100))
//!     .field(RuleSet::for_field("Description").max_length(500))
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new().with("Title", "").with("Description", "ok");
//! let result = validator.validate(&record).unwrap();
//!
//! assert!(!result.is_valid());
//! assert!(result.failures().iter().all(|f| f.field() == "Title"));
//! ```
//!
//! ## Guards and custom predicates
//!
//! ```
//! use rulecheck_validation::{FieldValue, Record, RuleSet, Validator};
//!
//! let validator = Validator::builder()
//!     .field(
//!         RuleSet::for_field("Age")
//!             .must_satisfy(|value: &FieldValue| value.as_i64().is_some_and(|age| age >= 18))
//!             .when_present("Age")
//!             .with_message("{PropertyName} must be at least 18"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! // Absent optional field: the guard skips the rule
//! assert!(validator.validate(&Record::new()).unwrap().is_valid());
//!
//! let result = validator.validate(&Record::new().with("Age", 17)).unwrap();
//! assert_eq!(result.failures()[0].message(), "Age must be at least 18");
//! ```
//!
//! ## Message templates
//!
//! ```
//! use rulecheck_validation::message;
//! use std::collections::HashMap;
//!
//! let context = HashMap::from([
//!     ("PropertyName".to_string(), "Title".to_string()),
//!     ("MinLength".to_string(), "3".to_string()),
//!     ("MaxLength".to_string(), "100".to_string()),
//! ]);
//! assert_eq!(
//!     message::format("{PropertyName} must be between {MinLength} and {MaxLength}", &context),
//!     "Title must be between 3 and 100"
//! );
//! ```

mod config;
mod errors;
pub mod message;
mod rules;
mod traits;
mod validator;
mod validators;
mod value;

pub use config::*;
pub use errors::*;
pub use message::MessageFormatter;
pub use rules::*;
pub use traits::*;
pub use validator::*;
pub use validators::{IsEmail, Length, Matches, NotEmpty, PREDICATE_MESSAGE, PREDICATE_NAME};
pub use value::*;
