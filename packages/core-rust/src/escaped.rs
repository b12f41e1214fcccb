//! Escaped payload: a whole form object serialized into one reserved field.
//!
//! Clients that need nested data, unions, or values plain form fields cannot
//! express send the object as tagged JSON instead of individual fields.
//!
//! # Wire format
//!
//! UTF-8 JSON. Plain JSON values map directly; object member order is kept.
//! Anything plain JSON cannot carry is a single-key object whose key is a
//! `$` tag:
//!
//! | tag          | payload                   | value                           |
//! |--------------|---------------------------|---------------------------------|
//! | `$date`      | RFC 3339 string or `null` | date (`null`: invalid date)     |
//! | `$set`       | array                     | set                             |
//! | `$map`       | array of `[key, value]`   | map with arbitrary keys         |
//! | `$bigint`    | decimal string            | big integer                     |
//! | `$number`    | `NaN`/`Infinity`/`-Infinity` | non-finite number            |
//! | `$symbol`    | string                    | fresh symbol with description   |
//! | `$undefined` | anything                  | no value (object member dropped)|
//! | `$object`    | object                    | literal object                  |
//!
//! `$object` escapes a real object whose only key happens to start with `$`.
//! Files cannot be inlined; they are encoded as `$undefined` and travel as
//! separate fields named `<file prefix><dotted path>`.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use num_bigint::BigInt;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::form_data::{FormData, FormEntry};
use crate::options::ReservedFields;
use crate::value::{FormObject, FormValue, Symbol};

/// Errors decoding an escaped payload.
#[derive(Debug, thiserror::Error)]
pub enum EscapedError {
    #[error("escaped payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown escaped payload tag {0:?}")]
    UnknownTag(String),
    #[error("malformed {tag} payload")]
    Malformed { tag: &'static str },
    #[error("escaped payload must decode to an object, got {0}")]
    NotAnObject(&'static str),
}

/// Encodes `value` into the wire format.
#[must_use]
pub fn encode(value: &FormValue) -> String {
    to_json(value).to_string()
}

/// Decodes wire-format text into a value.
///
/// # Errors
///
/// Returns [`EscapedError`] for invalid JSON, unknown tags, malformed tag
/// payloads, or a top-level `$undefined`.
pub fn decode(text: &str) -> Result<FormValue, EscapedError> {
    let json: Value = serde_json::from_str(text)?;
    from_json(json)?.ok_or(EscapedError::NotAnObject("undefined"))
}

/// Decodes wire-format text that must hold an object.
///
/// # Errors
///
/// As [`decode`], plus [`EscapedError::NotAnObject`] for any other value.
pub fn decode_object(text: &str) -> Result<FormObject, EscapedError> {
    match decode(text)? {
        FormValue::Object(object) => Ok(object),
        other => Err(EscapedError::NotAnObject(other.type_name())),
    }
}

/// Reads the escaped payload out of `form`, if there is a usable one.
///
/// Repeated payload fields are concatenated in order. Files sent under the
/// reserved file prefix are placed into the decoded object at their path.
/// A malformed payload yields `None` so the caller can fall back to
/// field-by-field coercion.
#[must_use]
pub fn extract_payload(form: &FormData, reserved: &ReservedFields) -> Option<FormObject> {
    let text: String = form
        .get_all(&reserved.payload_field)
        .into_iter()
        .filter_map(FormEntry::as_text)
        .collect();
    if text.is_empty() {
        return None;
    }

    match decode_object(&text) {
        Ok(mut object) => {
            insert_files(&mut object, form, &reserved.file_prefix);
            Some(object)
        }
        Err(err) => {
            debug!(error = %err, "ignoring malformed escaped payload");
            None
        }
    }
}

/// JSON representation of a value in the wire format.
#[must_use]
pub fn to_json(value: &FormValue) -> Value {
    match value {
        FormValue::Null => Value::Null,
        FormValue::Bool(b) => Value::Bool(*b),
        FormValue::Integer(i) => Value::from(*i),
        FormValue::Number(n) => Number::from_f64(*n).map_or_else(
            || tagged("$number", Value::from(non_finite_name(*n))),
            Value::Number,
        ),
        FormValue::BigInt(big) => tagged("$bigint", Value::String(big.to_string())),
        FormValue::String(s) => Value::String(s.clone()),
        FormValue::Date(date) => tagged(
            "$date",
            Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
        FormValue::InvalidDate => tagged("$date", Value::Null),
        FormValue::Symbol(symbol) => tagged("$symbol", Value::String(symbol.description().to_string())),
        FormValue::File(_) => tagged("$undefined", Value::Bool(true)),
        FormValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        FormValue::Set(items) => tagged("$set", Value::Array(items.iter().map(to_json).collect())),
        FormValue::Map(entries) => tagged(
            "$map",
            Value::Array(
                entries
                    .iter()
                    .map(|(key, value)| Value::Array(vec![to_json(key), to_json(value)]))
                    .collect(),
            ),
        ),
        FormValue::Object(object) => {
            let members: Map<String, Value> = object
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect();
            if members.len() == 1 && members.keys().all(|key| key.starts_with('$')) {
                tagged("$object", Value::Object(members))
            } else {
                Value::Object(members)
            }
        }
    }
}

impl Serialize for FormValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

fn tagged(tag: &str, payload: Value) -> Value {
    let mut members = Map::new();
    members.insert(tag.to_string(), payload);
    Value::Object(members)
}

fn non_finite_name(n: f64) -> &'static str {
    if n.is_nan() {
        "NaN"
    } else if n > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// Converts decoded JSON into a value; `None` means undefined.
fn from_json(json: Value) -> Result<Option<FormValue>, EscapedError> {
    let value = match json {
        Value::Null => FormValue::Null,
        Value::Bool(b) => FormValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FormValue::Integer(i),
            None => FormValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FormValue::String(s),
        Value::Array(items) => FormValue::Array(decode_items(items)?),
        Value::Object(members) => {
            let is_tag = members.len() == 1 && members.keys().all(|key| key.starts_with('$'));
            if is_tag {
                if let Some((tag, payload)) = members.into_iter().next() {
                    return from_tagged(&tag, payload);
                }
                return Ok(Some(FormValue::Object(FormObject::new())));
            }
            FormValue::Object(decode_members(members)?)
        }
    };
    Ok(Some(value))
}

fn from_tagged(tag: &str, payload: Value) -> Result<Option<FormValue>, EscapedError> {
    let value = match (tag, payload) {
        ("$undefined", _) => return Ok(None),
        ("$date", Value::Null) => FormValue::InvalidDate,
        ("$date", Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|date| FormValue::Date(date.with_timezone(&Utc)))
            .map_err(|_| EscapedError::Malformed { tag: "$date" })?,
        ("$set", Value::Array(items)) => FormValue::set(decode_items(items)?),
        ("$map", Value::Array(pairs)) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for pair in pairs {
                let Value::Array(mut kv) = pair else {
                    return Err(EscapedError::Malformed { tag: "$map" });
                };
                if kv.len() != 2 {
                    return Err(EscapedError::Malformed { tag: "$map" });
                }
                let value = from_json(kv.pop().unwrap_or(Value::Null))?.unwrap_or(FormValue::Null);
                let key = from_json(kv.pop().unwrap_or(Value::Null))?.unwrap_or(FormValue::Null);
                entries.push((key, value));
            }
            FormValue::Map(entries)
        }
        ("$bigint", Value::String(text)) => BigInt::from_str(&text)
            .map(FormValue::BigInt)
            .map_err(|_| EscapedError::Malformed { tag: "$bigint" })?,
        ("$number", Value::String(text)) => match text.as_str() {
            "NaN" => FormValue::nan(),
            "Infinity" => FormValue::Number(f64::INFINITY),
            "-Infinity" => FormValue::Number(f64::NEG_INFINITY),
            _ => return Err(EscapedError::Malformed { tag: "$number" }),
        },
        ("$symbol", Value::String(text)) => FormValue::Symbol(Symbol::new(text)),
        ("$object", Value::Object(members)) => FormValue::Object(decode_members(members)?),
        (known @ ("$date" | "$set" | "$map" | "$bigint" | "$number" | "$symbol" | "$object"), _) => {
            return Err(EscapedError::Malformed {
                tag: static_tag(known),
            })
        }
        (unknown, _) => return Err(EscapedError::UnknownTag(unknown.to_string())),
    };
    Ok(Some(value))
}

fn static_tag(tag: &str) -> &'static str {
    match tag {
        "$date" => "$date",
        "$set" => "$set",
        "$map" => "$map",
        "$bigint" => "$bigint",
        "$number" => "$number",
        "$symbol" => "$symbol",
        _ => "$object",
    }
}

/// Array elements; undefined elements become `null` so indices are kept.
fn decode_items(items: Vec<Value>) -> Result<Vec<FormValue>, EscapedError> {
    items
        .into_iter()
        .map(|item| Ok(from_json(item)?.unwrap_or(FormValue::Null)))
        .collect()
}

/// Object members; undefined members are dropped.
fn decode_members(members: Map<String, Value>) -> Result<FormObject, EscapedError> {
    let mut object = FormObject::with_capacity(members.len());
    for (key, value) in members {
        if let Some(value) = from_json(value)? {
            object.insert(key, value);
        }
    }
    Ok(object)
}

fn insert_files(object: &mut FormObject, form: &FormData, prefix: &str) {
    for (key, entry) in form.iter() {
        let (Some(path), FormEntry::File(file)) = (key.strip_prefix(prefix), entry) else {
            continue;
        };
        let segments: Vec<&str> = path.split('.').collect();
        if !set_in_object(object, &segments, FormValue::File(file.clone())) {
            debug!(field = key, "no place for file in escaped payload");
        }
    }
}

/// Places `value` at `segments` below `object`; returns whether it was placed.
fn set_in_object(object: &mut FormObject, segments: &[&str], value: FormValue) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };
    if let Some(slot) = object.get_mut(*head) {
        return set_path(slot, rest, value);
    }
    let mut slot = container_for(rest);
    let placed = set_path(&mut slot, rest, value);
    if placed {
        object.insert((*head).to_string(), slot);
    }
    placed
}

fn set_path(target: &mut FormValue, segments: &[&str], value: FormValue) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return true;
    };
    match target {
        FormValue::Object(object) => set_in_object(object, segments, value),
        FormValue::Array(items) => {
            // Array indices may address an existing slot or append; gaps are skipped.
            let Ok(index) = head.parse::<usize>() else {
                return false;
            };
            if let Some(slot) = items.get_mut(index) {
                if slot.is_null() && !rest.is_empty() {
                    *slot = container_for(rest);
                }
                return set_path(slot, rest, value);
            }
            if index != items.len() {
                return false;
            }
            let mut slot = container_for(rest);
            let placed = set_path(&mut slot, rest, value);
            if placed {
                items.push(slot);
            }
            placed
        }
        _ => false,
    }
}

fn container_for(rest: &[&str]) -> FormValue {
    match rest.first() {
        None => FormValue::Null,
        Some(next) if next.parse::<usize>().is_ok() => FormValue::Array(Vec::new()),
        Some(_) => FormValue::Object(FormObject::new()),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::TimeZone;

    use super::*;
    use crate::value::UploadedFile;

    #[test]
    fn decodes_dates_and_sets() {
        let object = decode_object(
            r#"{"name":"Ada","born":{"$date":"1815-12-10T00:00:00.000Z"},"tags":{"$set":["a","b","a"]}}"#,
        )
        .expect("decode");
        assert_eq!(object["name"], FormValue::from("Ada"));
        assert_eq!(
            object["born"],
            FormValue::Date(Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(
            object["tags"],
            FormValue::Set(vec![FormValue::from("a"), FormValue::from("b")])
        );
    }

    #[test]
    fn encode_then_decode_preserves_nested_structure() {
        let mut inner = FormObject::new();
        inner.insert("big".into(), FormValue::BigInt(BigInt::from(7)));
        inner.insert("nan".into(), FormValue::nan());
        inner.insert("bad".into(), FormValue::InvalidDate);
        let mut object = FormObject::new();
        object.insert("inner".into(), FormValue::Object(inner));
        object.insert(
            "pairs".into(),
            FormValue::Map(vec![(FormValue::Integer(1), FormValue::from("one"))]),
        );
        object.insert("list".into(), FormValue::Array(vec![FormValue::Number(1.5)]));

        let decoded = decode_object(&encode(&FormValue::Object(object.clone()))).expect("decode");
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["inner", "pairs", "list"]);
        let inner = decoded["inner"].as_object().expect("inner");
        assert_eq!(inner["big"], FormValue::BigInt(BigInt::from(7)));
        assert!(inner["nan"].is_nan());
        assert_eq!(inner["bad"], FormValue::InvalidDate);
        assert_eq!(decoded["pairs"], object["pairs"]);
        assert_eq!(decoded["list"], object["list"]);
    }

    #[test]
    fn dollar_keyed_objects_are_escaped() {
        let mut object = FormObject::new();
        object.insert("$date".into(), FormValue::from("not a tag"));
        let text = encode(&FormValue::Object(object.clone()));
        assert_eq!(text, r#"{"$object":{"$date":"not a tag"}}"#);
        assert_eq!(decode(&text).expect("decode"), FormValue::Object(object));
    }

    #[test]
    fn undefined_members_are_dropped_and_items_nulled() {
        let object =
            decode_object(r#"{"a":{"$undefined":true},"b":[1,{"$undefined":true}]}"#).expect("decode");
        assert!(!object.contains_key("a"));
        assert_eq!(
            object["b"],
            FormValue::Array(vec![FormValue::Integer(1), FormValue::Null])
        );
    }

    #[test]
    fn rejects_unknown_tags_and_bad_payloads() {
        assert!(matches!(decode(r#"{"$nope":1}"#), Err(EscapedError::UnknownTag(tag)) if tag == "$nope"));
        assert!(matches!(
            decode(r#"{"$bigint":"1.5"}"#),
            Err(EscapedError::Malformed { tag: "$bigint" })
        ));
        assert!(matches!(
            decode(r#"{"$set":"x"}"#),
            Err(EscapedError::Malformed { tag: "$set" })
        ));
        assert!(matches!(decode("{"), Err(EscapedError::Json(_))));
        assert!(matches!(decode_object("[1]"), Err(EscapedError::NotAnObject("array"))));
    }

    #[test]
    fn extract_concatenates_chunks() {
        let form = FormData::new()
            .with("__formcast_json", r#"{"a":"#)
            .with("other", "x")
            .with("__formcast_json", "1}");
        let object = extract_payload(&form, &ReservedFields::default()).expect("payload");
        assert_eq!(object["a"], FormValue::Integer(1));
    }

    #[test]
    fn extract_ignores_missing_or_malformed_payloads() {
        let reserved = ReservedFields::default();
        assert!(extract_payload(&FormData::new().with("a", "1"), &reserved).is_none());
        assert!(extract_payload(&FormData::new().with("__formcast_json", ""), &reserved).is_none());
        assert!(extract_payload(&FormData::new().with("__formcast_json", "{oops"), &reserved).is_none());
        assert!(extract_payload(&FormData::new().with("__formcast_json", "42"), &reserved).is_none());
    }

    #[test]
    fn extract_places_files_at_their_paths() {
        let file = UploadedFile::new(Some("cv.pdf".into()), None, Bytes::from_static(b"%PDF"));
        let form = FormData::new()
            .with(
                "__formcast_json",
                r#"{"docs":[{"title":"CV","file":{"$undefined":true}}]}"#,
            )
            .with("__formcast_file_docs.0.file", file.clone())
            .with("__formcast_file_avatar", file.clone())
            .with("__formcast_file_extra.0", file.clone())
            .with("__formcast_file_extra.1", file.clone());
        let object = extract_payload(&form, &ReservedFields::default()).expect("payload");

        let FormValue::Array(docs) = &object["docs"] else {
            panic!("expected array");
        };
        let doc = docs[0].as_object().expect("doc");
        assert_eq!(doc["title"], FormValue::from("CV"));
        assert_eq!(doc["file"], FormValue::File(file.clone()));
        assert_eq!(object["avatar"], FormValue::File(file.clone()));
        assert_eq!(
            object["extra"],
            FormValue::Array(vec![FormValue::File(file.clone()), FormValue::File(file)])
        );
    }

    #[test]
    fn file_paths_beyond_array_end_are_skipped() {
        let file = UploadedFile::new(Some("a.bin".into()), None, Bytes::from_static(b"a"));
        let form = FormData::new()
            .with("__formcast_json", r#"{"a":1,"list":["x"]}"#)
            .with("__formcast_file_list.18446744073709551615", file.clone())
            .with("__formcast_file_list.4000000000", file.clone())
            .with("__formcast_file_list.3", file.clone())
            .with("__formcast_file_fresh.2", file.clone())
            .with("__formcast_file_nested.0.deep.99", file.clone())
            .with("__formcast_file_list.1", file.clone());
        let object = extract_payload(&form, &ReservedFields::default()).expect("payload");

        assert_eq!(object["a"], FormValue::Integer(1));
        assert_eq!(
            object["list"],
            FormValue::Array(vec![FormValue::from("x"), FormValue::File(file)])
        );
        assert!(!object.contains_key("fresh"));
        assert!(!object.contains_key("nested"));
    }

    #[test]
    fn serialize_uses_wire_format() {
        let value = FormValue::Set(vec![FormValue::Integer(1)]);
        assert_eq!(serde_json::to_string(&value).expect("json"), r#"{"$set":[1]}"#);
    }
}
