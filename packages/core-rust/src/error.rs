//! Error types raised by the coercion core.

/// Errors that abort a form-data parse.
///
/// Every variant carries the name of the field being processed so the
/// caller can attribute the failure without re-walking the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// The schema declares a shape that cannot be derived from string input.
    #[error("{message} (field: {field})")]
    Schema { field: String, message: String },
    /// A type tag outside the recognised primitive set reached the core.
    #[error("unsupported schema type for form data: {kind} (field: {field})")]
    UnsupportedKind { field: String, kind: String },
    /// Big-integer text that is not a valid decimal integer.
    #[error("cannot convert {value:?} to a big integer (field: {field})")]
    BigIntSyntax { field: String, value: String },
}

impl FormError {
    /// Builds a [`FormError::Schema`] for `field`.
    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the field the error is attributed to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Schema { field, .. }
            | Self::UnsupportedKind { field, .. }
            | Self::BigIntSyntax { field, .. } => field,
        }
    }

    /// Returns `true` for schema shape errors.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_names_field() {
        let err = FormError::schema("tags", "Arrays must have a single \"items\" property");
        assert_eq!(
            err.to_string(),
            "Arrays must have a single \"items\" property (field: tags)"
        );
        assert_eq!(err.field(), "tags");
        assert!(err.is_schema_error());
    }

    #[test]
    fn unsupported_kind_is_not_schema_error() {
        let err = FormError::UnsupportedKind {
            field: "x".to_string(),
            kind: "tuple".to_string(),
        };
        assert!(!err.is_schema_error());
        assert!(err.to_string().contains("tuple"));
    }
}
