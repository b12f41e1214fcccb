//! Entry point of the coercion core: form data in, [`ParsedForm`] out.

use serde::Serialize;

use crate::assemble::assemble;
use crate::error::FormError;
use crate::escaped::extract_payload;
use crate::form_data::{FormData, FormEntry};
use crate::options::ParseOptions;
use crate::schema::Schema;
use crate::value::FormObject;

/// Result of parsing one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedForm {
    /// Submission identifier echoed from the reserved id field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Coerced data, or `None` when nothing was submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FormObject>,
    /// Whether this was an actual submission rather than an empty form.
    pub posted: bool,
}

impl ParsedForm {
    /// Nothing submitted.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: None,
            data: None,
            posted: false,
        }
    }
}

/// Parses submitted form data against an object schema.
///
/// An escaped payload, when present and well formed, is returned as the
/// data verbatim; otherwise every field is coerced through the schema.
///
/// # Errors
///
/// Returns [`FormError`] when the schema cannot be applied to the form
/// (boolean schemas, unions, nested structures, malformed big integers).
pub fn parse_form_data(
    form: &FormData,
    schema: &Schema,
    options: &ParseOptions,
) -> Result<ParsedForm, FormError> {
    let id = form
        .get(&options.reserved.id_field)
        .and_then(FormEntry::as_text)
        .map(str::to_string);

    let data = match extract_payload(form, &options.reserved) {
        Some(data) => data,
        None => assemble(form, schema, options)?,
    };

    Ok(ParsedForm {
        id,
        data: Some(data),
        posted: true,
    })
}
