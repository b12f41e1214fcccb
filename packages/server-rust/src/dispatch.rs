//! Source dispatch: normalizes any [`FormSource`] into a [`ParsedForm`].

use tracing::{debug, trace};

use formcast_core::{parse_form_data, FormData, FormError, ParsedForm, Schema};

use crate::config::FormConfig;
use crate::request::BodyError;
use crate::source::{classify, FormSource};

/// Errors surfaced by [`parse_request`].
///
/// Unreadable bodies are not errors: they parse as an empty form. Only a
/// body that was already consumed is reported, since that is a caller bug.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("request body has already been consumed")]
    BodyAlreadyConsumed,
}

/// Parses `source` against `schema`.
///
/// Query-string sources are never submissions, so their `posted` flag is
/// always `false`. Plain objects are returned as data with `posted = false`.
///
/// # Errors
///
/// Returns [`ParseError::Form`] when the schema cannot be applied, and
/// [`ParseError::BodyAlreadyConsumed`] when a request body is read twice.
pub async fn parse_request(
    source: FormSource<'_>,
    schema: &Schema,
    config: &FormConfig,
) -> Result<ParsedForm, ParseError> {
    let kind = classify(&source);
    trace!(?kind, "classified form source");

    match source {
        FormSource::FormData(form) => Ok(parse_form_data(&form, schema, &config.parse)?),
        FormSource::Url(uri) => parse_query(uri.query().unwrap_or_default(), schema, config),
        FormSource::Query(query) => parse_query(&query, schema, config),
        FormSource::Request(event) => match event.form_data(config.body_limit).await {
            Ok(form) => Ok(parse_form_data(&form, schema, &config.parse)?),
            Err(BodyError::AlreadyConsumed) => Err(ParseError::BodyAlreadyConsumed),
            Err(err) => {
                debug!(error = %err, method = %event.method(), "request body unreadable, parsing as empty form");
                Ok(ParsedForm::empty())
            }
        },
        FormSource::Object(data) => Ok(ParsedForm {
            id: None,
            data,
            posted: false,
        }),
    }
}

fn parse_query(query: &str, schema: &Schema, config: &FormConfig) -> Result<ParsedForm, ParseError> {
    let form = match FormData::from_query(query) {
        Ok(form) => form,
        Err(err) => {
            debug!(error = %err, "query string unreadable, parsing as empty form");
            return Ok(ParsedForm::empty());
        }
    };
    let parsed = parse_form_data(&form, schema, &config.parse)?;
    Ok(ParsedForm {
        posted: false,
        ..parsed
    })
}
