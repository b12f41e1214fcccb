//! Coerced value model.
//!
//! [`FormValue`] is the closed set of values the coercion core can produce.
//! It covers everything plain JSON can carry plus the values form coercion
//! and the escaped payload format need on top: dates (and the invalid-date
//! sentinel), big integers, symbols, sets, maps with arbitrary keys, and
//! uploaded files. "Not a number" is carried as `Number(f64::NAN)`.
//!
//! There is no `undefined` member: operations that may yield "no value"
//! return `Option<FormValue>` and callers omit the key instead.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use uuid::Uuid;

/// Field name to value mapping, in insertion order.
pub type FormObject = IndexMap<String, FormValue>;

/// A coerced form value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Null,
    Bool(bool),
    /// Integer that fits in 64 bits.
    Integer(i64),
    /// IEEE 754 double, including NaN and the infinities.
    Number(f64),
    BigInt(BigInt),
    String(String),
    Date(DateTime<Utc>),
    /// Text that could not be read as a date.
    InvalidDate,
    Symbol(Symbol),
    File(UploadedFile),
    Array(Vec<FormValue>),
    /// Insertion-ordered, duplicate-free sequence. Build with [`FormValue::set`].
    Set(Vec<FormValue>),
    /// Map with arbitrary (non-string) keys, in insertion order.
    Map(Vec<(FormValue, FormValue)>),
    Object(FormObject),
}

impl FormValue {
    /// The not-a-number sentinel produced by failed numeric parses.
    #[must_use]
    pub fn nan() -> Self {
        Self::Number(f64::NAN)
    }

    /// Builds a set, dropping later duplicates under SameValueZero equality.
    #[must_use]
    pub fn set(items: impl IntoIterator<Item = FormValue>) -> Self {
        let mut unique: Vec<FormValue> = Vec::new();
        for item in items {
            if !unique.iter().any(|existing| existing.same_value_zero(&item)) {
                unique.push(item);
            }
        }
        Self::Set(unique)
    }

    /// Equality where NaN equals NaN; otherwise the same as `==`.
    #[must_use]
    pub fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self == other,
        }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_nan())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of `Integer` and `Number` values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&FormObject> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Date(_) | Self::InvalidDate => "date",
            Self::Symbol(_) => "symbol",
            Self::File(_) => "file",
            Self::Array(_) => "array",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FormValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<FormObject> for FormValue {
    fn from(value: FormObject) -> Self {
        Self::Object(value)
    }
}

/// A unique symbolic atom carrying a description.
///
/// Two symbols are equal only if they came from the same [`Symbol::new`]
/// call (or a clone of it), regardless of description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: Uuid,
    description: String,
}

impl Symbol {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// An uploaded file taken from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    /// Declared content type of the part, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

impl UploadedFile {
    #[must_use]
    pub fn new(file_name: Option<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            file_name,
            content_type,
            data,
        }
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
