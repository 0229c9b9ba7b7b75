// Field values and records

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static NULL: FieldValue = FieldValue::Null;

/// Dynamically typed value of a single record field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Date value. Text in `YYYY-MM-DD` form (or an RFC 3339 timestamp) is
    /// parsed, since JSON carries dates as strings.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
                chrono::DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.date_naive())
            }),
            _ => None,
        }
    }

    /// Length used by length rules.
    ///
    /// Text counts characters, lists count elements, `Null` is 0, and other
    /// scalars count the characters of their display form.
    pub fn length(&self) -> usize {
        match self {
            FieldValue::Null => 0,
            FieldValue::Text(s) => s.chars().count(),
            FieldValue::List(items) => items.len(),
            other => other.to_string().chars().count(),
        }
    }

    /// Null, whitespace-only text, or an empty list.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Float(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float))
                .unwrap_or(FieldValue::Null),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            // Nested objects are validated as opaque text
            obj @ Value::Object(_) => FieldValue::Text(obj.to_string()),
        }
    }
}

/// A record to validate: field name to value. Missing fields read as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field, returning the previous value if any.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Value of `field`, or `Null` when the record does not carry it.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Whether the record carries `field` at all (even as `Null`).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Whether `field` is present and not `Null`.
    pub fn has_value(&self, field: &str) -> bool {
        !self.get(field).is_null()
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object. Returns `None` for any other JSON value.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field_reads_as_null() {
        let record = Record::new().with("Title", "Hello");
        assert!(record.get("Description").is_null());
        assert!(!record.contains("Description"));
        assert!(record.has_value("Title"));
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(FieldValue::from("héllo").length(), 5);
        assert_eq!(FieldValue::Null.length(), 0);
        assert_eq!(FieldValue::from(vec![1, 2, 3]).length(), 3);
        assert_eq!(FieldValue::from(12345).length(), 5);
    }

    #[test]
    fn test_blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("  \t").is_blank());
        assert!(FieldValue::List(vec![]).is_blank());
        assert!(!FieldValue::from(0).is_blank());
        assert!(!FieldValue::from(false).is_blank());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(7)), FieldValue::Int(7));
    }

    #[test]
    fn test_from_json_object() {
        let record = Record::from_json(json!({
            "Title": "Rust",
            "Pages": 320,
            "Price": 39.5,
            "DateOfBirth": null,
            "Tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(record.get("Title"), &FieldValue::from("Rust"));
        assert_eq!(record.get("Pages"), &FieldValue::Int(320));
        assert_eq!(record.get("Price"), &FieldValue::Float(39.5));
        assert!(record.contains("DateOfBirth"));
        assert!(!record.has_value("DateOfBirth"));
        assert_eq!(record.get("Tags").length(), 2);
    }

    #[test]
    fn test_field_names_are_sorted() {
        let record = Record::new()
            .with("Title", "Dune")
            .with("Author", "Herbert")
            .with("Isbn", FieldValue::Null);
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, ["Author", "Isbn", "Title"]);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Record::from_json(json!([1, 2])).is_none());
        assert!(Record::from_json(json!("text")).is_none());
    }

    #[test]
    fn test_date_parsing_from_text() {
        let expected = NaiveDate::from_ymd_opt(2001, 4, 9).unwrap();
        assert_eq!(FieldValue::from("2001-04-09").as_date(), Some(expected));
        assert_eq!(
            FieldValue::from("2001-04-09T10:00:00Z").as_date(),
            Some(expected)
        );
        assert_eq!(FieldValue::from("yesterday").as_date(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::from(vec!["x", "y"]).to_string(), "x, y");
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert_eq!(FieldValue::from(date).to_string(), "2020-01-02");
    }
}
