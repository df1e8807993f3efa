//! Field-level validation of JSON request bodies.
//!
//! [`FieldReader`] walks a JSON object field by field, converting each value into
//! its typed form and recording a message against the field name when it cannot.
//! Readers never stop at the first problem: callers read every field and then
//! check [`FieldReader::is_clean`], so clients receive all errors at once.
//!
//! Messages follow a fixed vocabulary ("This field is required.", "A valid number
//! is required.", ...) that existing front-ends already display verbatim.

use crate::models::Choice;
use chrono::{NaiveDate, NaiveTime};
use nicu_types::{check_max_chars, NonEmptyText, TextError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key used for errors that belong to the body as a whole rather than one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const INVALID_NUMBER: &str = "A valid number is required.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_STRING: &str = "Not a valid string.";
const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
const INVALID_TIME: &str =
    "Time has wrong format. Use one of these formats instead: hh:mm[:ss[.uuuuuu]].";

/// Error messages keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an error map holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names that have at least one error, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

/// Name of a JSON value's type, as reported in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Reads typed fields out of a JSON object, collecting errors as it goes.
pub struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    /// Starts reading `body`.
    ///
    /// # Errors
    ///
    /// Returns a `non_field_errors` entry if `body` is not a JSON object.
    pub fn new(body: &'a Value) -> Result<Self, FieldErrors> {
        match body {
            Value::Object(map) => Ok(Self {
                body: map,
                errors: FieldErrors::new(),
            }),
            other => Err(FieldErrors::single(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(other)
                ),
            )),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    /// Records `message` against `field`.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Returns the value for a required field, recording an error when it is
    /// absent or null.
    fn required(&mut self, field: &str) -> Option<&'a Value> {
        match self.body.get(field) {
            None => {
                self.reject(field, REQUIRED);
                None
            }
            Some(Value::Null) => {
                self.reject(field, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// Returns the value for an optional field; absent, null and blank strings
    /// all read as `None`.
    fn optional(&self, field: &str) -> Option<&'a Value> {
        match self.body.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    pub fn required_text(&mut self, field: &str, max_chars: usize) -> Option<NonEmptyText> {
        let value = self.required(field)?;
        let raw = self.text_of(field, value)?;
        match NonEmptyText::bounded(&raw, max_chars) {
            Ok(text) => Some(text),
            Err(TextError::Empty) => {
                self.reject(field, NOT_BLANK);
                None
            }
            Err(TextError::TooLong { max }) => {
                self.reject(field, too_long(max));
                None
            }
        }
    }

    /// Reads optional free text. Blank strings are kept as supplied.
    pub fn optional_text(&mut self, field: &str, max_chars: usize) -> Option<String> {
        let value = match self.body.get(field) {
            None | Some(Value::Null) => return None,
            Some(value) => value,
        };
        let text = self.text_of(field, value)?;
        if let Err(TextError::TooLong { max }) = check_max_chars(&text, max_chars) {
            self.reject(field, too_long(max));
            return None;
        }
        Some(text)
    }

    pub fn required_number(&mut self, field: &str) -> Option<f64> {
        let value = self.required(field)?;
        self.number_of(field, value)
    }

    pub fn optional_number(&mut self, field: &str) -> Option<f64> {
        let value = self.optional(field)?;
        self.number_of(field, value)
    }

    pub fn optional_integer(&mut self, field: &str) -> Option<i64> {
        let value = self.optional(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
            }
            _ => None,
        };
        if parsed.is_none() {
            self.reject(field, INVALID_INTEGER);
        }
        parsed
    }

    pub fn required_date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = self.required(field)?;
        let parsed = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.reject(field, INVALID_DATE);
        }
        parsed
    }

    pub fn optional_time(&mut self, field: &str) -> Option<NaiveTime> {
        let value = self.optional(field)?;
        let parsed = value.as_str().and_then(|s| {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
        });
        if parsed.is_none() {
            self.reject(field, INVALID_TIME);
        }
        parsed
    }

    pub fn required_choice<T: Choice>(&mut self, field: &str) -> Option<T> {
        let value = self.required(field)?;
        self.choice_of(field, value)
    }

    pub fn optional_choice<T: Choice>(&mut self, field: &str) -> Option<T> {
        let value = self.optional(field)?;
        self.choice_of(field, value)
    }

    /// Reads a primary-key reference to another record.
    ///
    /// Accepts an integer or a string of digits, as sent by form-driven clients.
    pub fn required_pk(&mut self, field: &str) -> Option<i64> {
        let value = self.required(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            let message = match value {
                Value::String(s) => format!("Invalid pk \"{}\" - object does not exist.", s),
                other => format!(
                    "Incorrect type. Expected pk value, received {}.",
                    json_type_name(other)
                ),
            };
            self.reject(field, message);
        }
        parsed
    }

    fn text_of(&mut self, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.reject(field, INVALID_STRING);
                None
            }
        }
    }

    fn number_of(&mut self, field: &str, value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite());
        if parsed.is_none() {
            self.reject(field, INVALID_NUMBER);
        }
        parsed
    }

    fn choice_of<T: Choice>(&mut self, field: &str, value: &Value) -> Option<T> {
        let parsed = value.as_str().and_then(|s| T::from_wire(s.trim()));
        if parsed.is_none() {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self.reject(field, format!("\"{}\" is not a valid choice.", shown));
        }
        parsed
    }
}

fn whole_number(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Overlays `patch` onto `base`, key by key.
///
/// Used for partial updates: the stored record is serialised, the client's keys
/// replace the stored ones, and the result is validated as a full body.
pub fn merge_patch(base: Value, patch: &Value) -> Result<Value, FieldErrors> {
    let patch = match patch {
        Value::Object(map) => map,
        other => {
            return Err(FieldErrors::single(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(other)
                ),
            ))
        }
    };
    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;
    use serde_json::json;

    #[test]
    fn test_new_rejects_non_object_body() {
        let errors = FieldReader::new(&json!([1, 2])).err().expect("list body should fail");
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["Invalid data. Expected a dictionary, but got list.".to_string()][..])
        );
    }

    #[test]
    fn test_required_distinguishes_missing_null_and_blank() {
        let body = json!({ "b": null, "c": "   " });
        let mut reader = FieldReader::new(&body).unwrap();
        assert!(reader.required_text("a", 10).is_none());
        assert!(reader.required_text("b", 10).is_none());
        assert!(reader.required_text("c", 10).is_none());
        let errors = reader.into_errors();
        assert_eq!(errors.get("a"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("b"), Some(&[NOT_NULL.to_string()][..]));
        assert_eq!(errors.get("c"), Some(&[NOT_BLANK.to_string()][..]));
    }

    #[test]
    fn test_numbers_reject_non_finite_and_booleans() {
        let body = json!({ "a": "NaN", "b": true, "c": "inf" });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.optional_number("a"), None);
        assert_eq!(reader.optional_number("b"), None);
        assert_eq!(reader.optional_number("c"), None);
        assert_eq!(reader.into_errors().fields().count(), 3);
    }

    #[test]
    fn test_text_rejects_booleans_but_accepts_numbers() {
        let body = json!({ "a": true, "b": false, "c": 150 });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.optional_text("a", 10), None);
        assert_eq!(reader.required_text("b", 10), None);
        assert_eq!(reader.optional_text("c", 10).as_deref(), Some("150"));
        let errors = reader.into_errors();
        assert_eq!(errors.get("a"), Some(&[INVALID_STRING.to_string()][..]));
        assert_eq!(errors.get("b"), Some(&[INVALID_STRING.to_string()][..]));
        assert_eq!(errors.get("c"), None);
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let body = json!({ "a": 4.0, "b": "7" });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.optional_integer("a"), Some(4));
        assert_eq!(reader.optional_integer("b"), Some(7));
        assert!(reader.is_clean());
    }

    #[test]
    fn test_time_accepts_minutes_and_seconds() {
        let body = json!({ "a": "23:59", "b": "08:05:30", "c": "25:00" });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.optional_time("a"), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(reader.optional_time("b"), NaiveTime::from_hms_opt(8, 5, 30));
        assert_eq!(reader.optional_time("c"), None);
        assert_eq!(reader.into_errors().get("c"), Some(&[INVALID_TIME.to_string()][..]));
    }

    #[test]
    fn test_choice_is_exact() {
        let body = json!({ "a": "male", "b": "Male" });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.required_choice::<Sex>("a"), None);
        assert_eq!(reader.required_choice::<Sex>("b"), Some(Sex::Male));
    }

    #[test]
    fn test_pk_reports_non_numeric_string_as_missing_object() {
        let body = json!({ "patient": "abc" });
        let mut reader = FieldReader::new(&body).unwrap();
        assert_eq!(reader.required_pk("patient"), None);
        assert_eq!(
            reader.into_errors().get("patient"),
            Some(&["Invalid pk \"abc\" - object does not exist.".to_string()][..])
        );
    }

    #[test]
    fn test_merge_patch_overlays_keys() {
        let merged = merge_patch(json!({ "a": 1, "b": 2 }), &json!({ "b": null, "c": 3 })).unwrap();
        assert_eq!(merged, json!({ "a": 1, "b": null, "c": 3 }));
    }

    #[test]
    fn test_display_joins_fields() {
        let mut errors = FieldErrors::single("b", "second");
        errors.add("a", "first");
        assert_eq!(errors.to_string(), "a: first; b: second");
    }
}
