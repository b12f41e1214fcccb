//! Parse-then-validate orchestration over a [`ValidationAdapter`].

use serde::Serialize;

use formcast_core::{FieldErrors, FormObject, ValidationAdapter};

use crate::config::FormConfig;
use crate::dispatch::{parse_request, ParseError};
use crate::source::FormSource;

/// Outcome of parsing and validating one form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub valid: bool,
    pub posted: bool,
    /// Field errors; always empty when nothing was posted.
    pub errors: FieldErrors,
    pub data: FormObject,
}

/// Parses `source` with the adapter's schema, then validates the result.
///
/// Errors for a form that was not posted are dropped so a freshly loaded
/// form does not show validation messages.
///
/// # Errors
///
/// Propagates [`ParseError`] from [`parse_request`].
pub async fn validate_form<A>(
    source: FormSource<'_>,
    adapter: &A,
    config: &FormConfig,
) -> Result<FormValidation, ParseError>
where
    A: ValidationAdapter + ?Sized,
{
    let parsed = parse_request(source, adapter.schema(), config).await?;
    let data = parsed.data.unwrap_or_default();
    let outcome = adapter.validate(&data).await;

    Ok(FormValidation {
        id: parsed.id,
        valid: outcome.valid,
        posted: parsed.posted,
        errors: if parsed.posted {
            outcome.errors
        } else {
            FieldErrors::new()
        },
        data,
    })
}

#[cfg(test)]
mod tests {
    use formcast_core::{FormData, FormValue, JsonSchemaAdapter, Schema, SchemaNode};

    use super::*;

    fn adapter() -> JsonSchemaAdapter {
        JsonSchemaAdapter::new(
            SchemaNode::object([("email", Schema::kind("string")), ("age", Schema::kind("integer"))])
                .with_required(["email"])
                .into(),
        )
    }

    #[tokio::test]
    async fn posted_invalid_form_reports_errors() {
        let form = FormData::new().with("age", "old");
        let result = validate_form(form.into(), &adapter(), &FormConfig::default())
            .await
            .expect("validate");

        assert!(result.posted);
        assert!(!result.valid);
        assert_eq!(result.errors["email"], vec!["Required".to_string()]);
        assert!(result.errors.contains_key("age"));
        assert!(result.data["age"].is_nan());
    }

    #[tokio::test]
    async fn unposted_form_hides_errors() {
        let result = validate_form(FormSource::query(""), &adapter(), &FormConfig::default())
            .await
            .expect("validate");

        assert!(!result.posted);
        assert!(!result.valid);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn valid_form_keeps_id_and_data() {
        let form = FormData::new()
            .with("__formcast_id", "f1")
            .with("email", "ada@example.com")
            .with("age", "36");
        let adapter: Box<dyn ValidationAdapter> = Box::new(adapter());
        let result = validate_form(form.into(), adapter.as_ref(), &FormConfig::default())
            .await
            .expect("validate");

        assert!(result.valid);
        assert_eq!(result.id.as_deref(), Some("f1"));
        assert_eq!(result.data["age"], FormValue::Integer(36));
    }
}
