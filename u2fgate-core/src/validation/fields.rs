use std::fmt;

use serde_json::Value;

use super::FormatError;

/// A single rejected field of a loosely typed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Wire name of the field, e.g. `registrationData`.
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every field-level violation found in one message, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: FieldViolation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldViolation> {
        self.0.iter()
    }

    /// Reason reported for `field`, if it was rejected.
    pub fn reason_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.reason.as_str())
    }

    /// `Ok(())` when nothing was rejected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl IntoIterator for Violations {
    type Item = FieldViolation;
    type IntoIter = std::vec::IntoIter<FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a FieldViolation;
    type IntoIter = std::slice::Iter<'a, FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub(crate) const MAY_NOT_BE_EMPTY: &str = "may not be empty";
pub(crate) const MUST_BE_NUMERIC: &str = "must be numeric";

/// Read a string field from a JSON object.
///
/// A missing, null or blank value is a violation only when `required`;
/// otherwise it reads as the empty string.
pub(crate) fn string_field(
    object: &Value,
    field: &'static str,
    required: bool,
    violations: &mut Violations,
) -> String {
    match object.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            if required {
                violations.push(FieldViolation::new(field, MAY_NOT_BE_EMPTY));
            }
            String::new()
        }
        Some(_) => {
            violations.push(FieldViolation::new(field, FormatError::NotAString.to_string()));
            String::new()
        }
    }
}

/// Read an optional integer field, accepting JSON numbers and numeric strings.
///
/// Form posts carry every value as a string, so `"4"` reads as `4`. An empty
/// string reads as absent.
pub(crate) fn numeric_field(
    object: &Value,
    field: &'static str,
    violations: &mut Violations,
) -> Option<i64> {
    let parsed = match object.get(field) {
        None | Some(Value::Null) => return None,
        Some(Value::String(value)) if value.trim().is_empty() => return None,
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(value)) => value.trim().parse().ok(),
        Some(_) => None,
    };

    if parsed.is_none() {
        violations.push(FieldViolation::new(field, MUST_BE_NUMERIC));
    }
    parsed
}
