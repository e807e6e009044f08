use std::collections::HashMap;

use serde::Serialize;
use validator::ValidateEmail;

/// Accumulated validation state for one form
///
/// Every form type owns one `Validator`. Field errors are keyed by the
/// submitted field name and keep only the first message recorded per field;
/// later messages for an already-errored field are ignored. Non-field
/// errors apply to the form as a whole and keep their recording order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validator {
    /// First error message per field name
    pub field_errors: HashMap<String, String>,

    /// Form-level error messages, in recording order
    pub non_field_errors: Vec<String>,
}

impl Validator {
    /// Create a new empty validator
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no field errors and no non-field errors were recorded
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` against `field` if `ok` is false
    ///
    /// A field that already carries an error keeps its first message.
    pub fn check_field(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    /// Unconditionally record a field error (first message wins)
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// Unconditionally record a form-level error
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }
}

// Validation primitives. Pure functions over field values; handlers decide
// which to apply to which field and in which order.

/// True if the value contains non-whitespace content
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if the value contains at most `n` characters
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if the value contains at least `n` characters
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True if the value is one of the permitted integers
pub fn permitted_value(value: i64, permitted: &[i64]) -> bool {
    permitted.contains(&value)
}

/// True if the value matches the email-address pattern
pub fn is_email(value: &str) -> bool {
    value.validate_email()
}
