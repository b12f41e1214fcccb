//! Request-level configuration for form parsing.

use formcast_core::ParseOptions;

/// Default cap on buffered request bodies: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Configuration for [`crate::parse_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Maximum number of body bytes read from a request.
    pub body_limit: usize,
    /// Options handed to the coercion core.
    pub parse: ParseOptions,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            parse: ParseOptions::default(),
        }
    }
}

impl FormConfig {
    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    #[must_use]
    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_config_defaults() {
        let config = FormConfig::default();
        assert_eq!(config.body_limit, 2_097_152);
        assert_eq!(config.parse, ParseOptions::default());
        assert!(!config.parse.allow_files);
    }

    #[test]
    fn form_config_builders() {
        let config = FormConfig::default()
            .with_body_limit(1024)
            .with_parse(ParseOptions::default().with_allow_files(true));
        assert_eq!(config.body_limit, 1024);
        assert!(config.parse.allow_files);
    }
}
