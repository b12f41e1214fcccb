//! Ordered key/value multimap shared by every input source.
//!
//! Multipart bodies, url-encoded bodies, and query strings are all
//! normalised into [`FormData`] before coercion. Keys may repeat; entry
//! order is preserved exactly as submitted.

use crate::value::UploadedFile;

/// A single submitted value: text, or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEntry {
    Text(String),
    File(UploadedFile),
}

impl FormEntry {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) => None,
        }
    }
}

impl From<&str> for FormEntry {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FormEntry {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<UploadedFile> for FormEntry {
    fn from(value: UploadedFile) -> Self {
        Self::File(value)
    }
}

/// Error decoding an `application/x-www-form-urlencoded` string.
#[derive(Debug, thiserror::Error)]
#[error("malformed url-encoded data: {0}")]
pub struct QueryError(#[from] serde_urlencoded::de::Error);

/// Ordered multimap of form entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormEntry)>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a query string or url-encoded body. A leading `?` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the input cannot be decoded into pairs.
    pub fn from_query(query: &str) -> Result<Self, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
        Ok(pairs
            .into_iter()
            .map(|(key, value)| (key, FormEntry::Text(value)))
            .collect())
    }

    /// Appends an entry, keeping any existing entries under the same name.
    pub fn append(&mut self, name: impl Into<String>, entry: impl Into<FormEntry>) {
        self.entries.push((name.into(), entry.into()));
    }

    /// Builder-style [`FormData::append`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, entry: impl Into<FormEntry>) -> Self {
        self.append(name, entry);
        self
    }

    /// First entry under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Every entry under `name`, in submission order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&FormEntry> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, entry)| entry)
            .collect()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Distinct entry names in order of first appearance.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FormEntry>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_query_decodes_pairs_in_order() {
        let form = FormData::from_query("?name=John%20Doe&tag=a&tag=b+c").expect("decode");
        assert_eq!(form.len(), 3);
        assert_eq!(form.get("name"), Some(&FormEntry::from("John Doe")));
        assert_eq!(
            form.get_all("tag"),
            vec![&FormEntry::from("a"), &FormEntry::from("b c")]
        );
    }

    #[test]
    fn from_query_empty_string_is_empty_form() {
        let form = FormData::from_query("").expect("decode");
        assert!(form.is_empty());
    }

    #[test]
    fn get_returns_first_and_get_all_keeps_order() {
        let form = FormData::new().with("a", "1").with("b", "x").with("a", "2");
        assert_eq!(form.get("a").and_then(FormEntry::as_text), Some("1"));
        let all: Vec<_> = form.get_all("a").into_iter().filter_map(FormEntry::as_text).collect();
        assert_eq!(all, vec!["1", "2"]);
        assert!(form.get("missing").is_none());
    }

    #[test]
    fn keys_are_distinct_in_first_appearance_order() {
        let form: FormData = vec![("b", "1"), ("a", "2"), ("b", "3")].into_iter().collect();
        assert_eq!(form.keys(), vec!["b", "a"]);
        assert!(form.has("a"));
        assert!(!form.has("c"));
    }
}
