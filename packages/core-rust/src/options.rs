//! Parse configuration for the coercion core.

/// Default name of the field carrying the submission identifier.
pub const DEFAULT_ID_FIELD: &str = "__formcast_id";

/// Default name of the field carrying the escaped payload.
pub const DEFAULT_PAYLOAD_FIELD: &str = "__formcast_json";

/// Default prefix of fields carrying files that belong inside the escaped payload.
pub const DEFAULT_FILE_PREFIX: &str = "__formcast_file_";

/// Wire-level field names shared with the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedFields {
    /// Field whose first value becomes `ParsedForm::id`.
    pub id_field: String,
    /// Field (possibly repeated, chunks concatenated) carrying the escaped payload.
    pub payload_field: String,
    /// Prefix of file fields; the remainder of the name is a dotted path
    /// into the escaped payload.
    pub file_prefix: String,
}

impl Default for ReservedFields {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl ReservedFields {
    /// Whether `key` is one of the reserved fields and must never be coerced.
    #[must_use]
    pub fn is_reserved(&self, key: &str) -> bool {
        key == self.id_field || key == self.payload_field || key.starts_with(&self.file_prefix)
    }
}

/// Options for a single form-data parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub reserved: ReservedFields,
    /// Fields passed through without coercion.
    pub preprocessed: Vec<String>,
    /// Pass uploaded files through as values instead of dropping them.
    pub allow_files: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn with_preprocessed<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.preprocessed = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_allow_files(mut self, allow: bool) -> Self {
        self.allow_files = allow;
        self
    }

    #[must_use]
    pub fn with_reserved(mut self, reserved: ReservedFields) -> Self {
        self.reserved = reserved;
        self
    }

    #[must_use]
    pub fn is_preprocessed(&self, key: &str) -> bool {
        self.preprocessed.iter().any(|name| name == key)
    }
}
