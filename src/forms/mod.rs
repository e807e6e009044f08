/// Form decoding and validation
///
/// This module contains the mechanism that turns a submitted request body
/// into a typed form value. Each form type declares an explicit field table
/// (`FieldSpec`) mapping submitted input names to field parsers; decoding is
/// a lookup-and-convert step over that table, with explicit error values.
mod types;
mod validator;

pub use self::types::{PasswordUpdateForm, SnippetCreateForm, UserLoginForm, UserSignupForm};
pub use self::validator::{
    Validator, is_email, max_chars, min_chars, not_blank, permitted_value,
};

use std::collections::HashMap;

use crate::pipeline::PipelineError;

/// Parsed form-encoded request body
///
/// Pairs keep submission order; `get` returns the first value recorded for
/// a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    /// Parse an `application/x-www-form-urlencoded` body
    ///
    /// Fails with `MalformedBody` if the bytes are not valid form-encoded
    /// data. An empty body parses to an empty value set.
    pub fn parse(body: &[u8]) -> Result<Self, PipelineError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| PipelineError::malformed_body(e.to_string()))?;
        Ok(Self { pairs })
    }

    /// Get the first submitted value for a field name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of submitted pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The declared type of one form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String passthrough
    Text,
    /// Integer parse
    Integer,
}

/// One entry in a form's field table
///
/// Associates a submitted input name with the conversion applied to its
/// value and an optional default used when the field is absent from the
/// submission.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    /// Declare a text field
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            default: None,
        }
    }

    /// Declare an integer field
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            default: None,
        }
    }

    /// Attach a default literal used when the field is not submitted
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// A converted field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

/// The converted values for one form's field table
///
/// Produced by [`decode_form`]; every declared field is present. The typed
/// accessors fall back to empty/zero if the table and the form constructor
/// disagree on a name, which only a programming error can cause.
#[derive(Debug, Clone, Default)]
pub struct DecodedFields {
    values: HashMap<&'static str, FieldValue>,
}

impl DecodedFields {
    /// Take the text value for a declared field
    pub fn text(&self, name: &str) -> String {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Take the integer value for a declared field
    pub fn integer(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(FieldValue::Integer(n)) => *n,
            _ => 0,
        }
    }
}

/// A form type that can be decoded from submitted data
///
/// Implementors declare their field table once; [`decode_form`] drives the
/// conversion and hands the converted values to `from_fields`.
pub trait FormSchema: Sized {
    /// The field table: submitted name, conversion, optional default
    const FIELDS: &'static [FieldSpec];

    /// Build the form value from converted fields
    fn from_fields(fields: &DecodedFields) -> Self;
}

/// Decode a form value from parsed body data
///
/// Walks the form's declared field table. A declared field with no
/// submitted value and no default is a `MissingField` error; a value that
/// fails its declared conversion is an `InvalidField` error. Both are
/// client errors (400), distinct from validation failures (422) on a
/// successfully decoded form.
pub fn decode_form<F: FormSchema>(data: &FormData) -> Result<F, PipelineError> {
    let mut decoded = DecodedFields::default();

    for spec in F::FIELDS {
        let raw = match data.get(spec.name).or(spec.default) {
            Some(value) => value,
            None => return Err(PipelineError::missing_field(spec.name)),
        };

        let value = match spec.kind {
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Integer => match raw.trim().parse::<i64>() {
                Ok(n) => FieldValue::Integer(n),
                Err(_) => return Err(PipelineError::invalid_field(spec.name, raw)),
            },
        };

        decoded.values.insert(spec.name, value);
    }

    Ok(F::from_fields(&decoded))
}
