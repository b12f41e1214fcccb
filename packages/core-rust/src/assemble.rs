//! Field assembly: walks the schema's keys and coerces every submitted value.
//!
//! Key order follows the schema's declared properties, or the submitted
//! keys when the schema accepts undeclared properties. A declared key that
//! was not submitted is skipped, except for booleans, where absence means
//! `false` (an unchecked checkbox sends nothing).

use tracing::debug;

use crate::coerce::coerce_scalar;
use crate::error::FormError;
use crate::form_data::{FormData, FormEntry};
use crate::inspect::{inspect, reject_union, SchemaInfo};
use crate::options::ParseOptions;
use crate::schema::{PrimitiveKind, Schema};
use crate::value::{FormObject, FormValue};

/// Coerces `form` against the object schema `schema`.
///
/// Keys listed in `options.preprocessed` are passed through untouched.
/// Reserved fields are never coerced.
///
/// # Errors
///
/// Any [`FormError`] raised for any field aborts the whole assembly; no
/// partial output is returned.
pub fn assemble(
    form: &FormData,
    schema: &Schema,
    options: &ParseOptions,
) -> Result<FormObject, FormError> {
    let root = schema
        .node()
        .ok_or_else(|| FormError::schema("", "Schema cannot be defined as boolean"))?;
    let mut free_form: Option<Schema> = None;

    let keys: Vec<&str> = if root.allows_additional() {
        form.keys()
            .into_iter()
            .filter(|key| !options.reserved.is_reserved(key))
            .collect()
    } else {
        root.property_names().collect()
    };

    let mut output = FormObject::new();
    for key in keys {
        // Keys without a constraining schema are free-form text.
        let property = match root.property(key) {
            Some(schema) => schema,
            None => &*free_form.get_or_insert_with(|| Schema::kind(PrimitiveKind::String.as_str())),
        };
        let entries = form.get_all(key);
        let implied_optional = !root.is_required(key);

        if options.is_preprocessed(key) {
            if let Some(value) = pass_through(key, property, implied_optional, &entries)? {
                output.insert(key.to_string(), value);
            }
            continue;
        }

        let info = inspect(property, key, implied_optional, reject_union(key))?;

        if entries.is_empty() && !info.has(PrimitiveKind::Boolean) {
            debug!(field = key, "no value found");
            continue;
        }

        if info.is_collection() {
            let item_info = inspect(info.item_schema(key)?, key, false, reject_union(key))?;
            let mut items = Vec::with_capacity(entries.len());
            for entry in &entries {
                let value = coerce_entry(key, Some(*entry), &item_info, options)?;
                items.push(value.unwrap_or(FormValue::Null));
            }
            let value = if info.has(PrimitiveKind::Set) {
                FormValue::set(items)
            } else {
                FormValue::Array(items)
            };
            output.insert(key.to_string(), value);
        } else if let Some(value) = coerce_entry(key, entries.last().copied(), &info, options)? {
            output.insert(key.to_string(), value);
        }
    }

    Ok(output)
}

/// Raw value(s) of a preprocessed key: a list for collections, else the last entry.
fn pass_through(
    key: &str,
    property: &Schema,
    implied_optional: bool,
    entries: &[&FormEntry],
) -> Result<Option<FormValue>, FormError> {
    let Some(last) = entries.last() else {
        return Ok(None);
    };
    let info = inspect(property, key, implied_optional, |_| Ok(()))?;
    if info.is_collection() {
        Ok(Some(FormValue::Array(
            entries.iter().map(|entry| raw_value(entry)).collect(),
        )))
    } else {
        Ok(Some(raw_value(last)))
    }
}

fn raw_value(entry: &FormEntry) -> FormValue {
    match entry {
        FormEntry::Text(text) => FormValue::String(text.clone()),
        FormEntry::File(file) => FormValue::File(file.clone()),
    }
}

/// Coerces one entry (or its absence) against a single-kind [`SchemaInfo`].
fn coerce_entry(
    field: &str,
    entry: Option<&FormEntry>,
    info: &SchemaInfo<'_>,
    options: &ParseOptions,
) -> Result<Option<FormValue>, FormError> {
    if let Some(FormEntry::File(file)) = entry {
        if !options.allow_files {
            return Ok(None);
        }
        return Ok(if !file.is_empty() {
            Some(FormValue::File(file.clone()))
        } else if info.is_nullable {
            Some(FormValue::Null)
        } else {
            None
        });
    }

    let kind = match info.types.as_slice() {
        [] => PrimitiveKind::Any,
        [kind] => *kind,
        kinds => return reject_union(field)(kinds).map(|()| None),
    };
    let raw = entry.and_then(FormEntry::as_text);
    debug!(field, value = ?raw, %kind, "parsing field");
    coerce_scalar(field, raw, kind, info.is_nullable)
}
