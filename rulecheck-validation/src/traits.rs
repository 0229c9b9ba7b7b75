// Typed record support

use crate::Record;

/// A type whose values can be validated as records.
///
/// `FIELDS` lists every field a rule set may target; a validator built with
/// [`ValidatorBuilder::for_type`](crate::ValidatorBuilder::for_type) rejects
/// rule sets for anything else.
pub trait Validatable {
    const FIELDS: &'static [&'static str];

    fn to_record(&self) -> Record;
}
