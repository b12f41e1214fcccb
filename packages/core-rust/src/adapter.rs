//! Validation adapter seam.
//!
//! The coercion core only needs a schema to coerce against; validating the
//! coerced data belongs to whatever validation library the caller uses. An
//! adapter bridges the two: it exposes the schema it validates with and
//! validates coerced objects.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use crate::inspect::inspect;
use crate::schema::{Items, PrimitiveKind, Schema};
use crate::value::{FormObject, FormValue};

/// Field path to error messages, in the order errors were found.
pub type FieldErrors = IndexMap<String, Vec<String>>;

/// Outcome of validating one coerced object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: FieldErrors,
}

impl ValidationOutcome {
    #[must_use]
    pub fn from_errors(errors: FieldErrors) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Bridge between a validation library and the coercion core.
#[async_trait]
pub trait ValidationAdapter: Send + Sync {
    /// Schema the form data is coerced against.
    fn schema(&self) -> &Schema;

    /// Validates coerced data.
    async fn validate(&self, data: &FormObject) -> ValidationOutcome;
}

/// Adapter validating directly against a [`Schema`].
///
/// Checks `required` presence and that every value has one of the kinds its
/// schema allows, descending into objects, arrays, and sets. Undeclared keys
/// are ignored unless `additionalProperties` is a schema.
#[derive(Debug, Clone)]
pub struct JsonSchemaAdapter {
    schema: Schema,
}

impl JsonSchemaAdapter {
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Synchronous form of [`ValidationAdapter::validate`].
    #[must_use]
    pub fn check(&self, data: &FormObject) -> ValidationOutcome {
        let mut errors = FieldErrors::new();
        check_object(data, &self.schema, "", &mut errors);
        ValidationOutcome::from_errors(errors)
    }
}

#[async_trait]
impl ValidationAdapter for JsonSchemaAdapter {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn validate(&self, data: &FormObject) -> ValidationOutcome {
        self.check(data)
    }
}

fn push(errors: &mut FieldErrors, path: &str, message: impl Into<String>) {
    errors.entry(path.to_string()).or_default().push(message.into());
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn check_object(data: &FormObject, schema: &Schema, path: &str, errors: &mut FieldErrors) {
    let node = match schema {
        Schema::Bool(true) => return,
        Schema::Bool(false) => return push(errors, path, "No value is allowed here"),
        Schema::Node(node) => node,
    };

    for key in &node.required {
        if !data.contains_key(key) {
            push(errors, &join(path, key), "Required");
        }
    }

    for (key, value) in data {
        if let Some(property) = node.property(key) {
            check_value(value, property, &join(path, key), errors);
        }
    }
}

fn check_value(value: &FormValue, schema: &Schema, path: &str, errors: &mut FieldErrors) {
    match schema {
        Schema::Bool(true) => return,
        Schema::Bool(false) => return push(errors, path, "No value is allowed here"),
        Schema::Node(_) => {}
    }
    let info = match inspect(schema, path, false, |_| Ok(())) {
        Ok(info) => info,
        Err(err) => return push(errors, path, err.to_string()),
    };

    if value.is_null() {
        if !info.is_nullable && !info.types.is_empty() && !info.has(PrimitiveKind::Any) {
            push(errors, path, "Expected a value, received null");
        }
        return;
    }
    if let FormValue::InvalidDate = value {
        if info.has(PrimitiveKind::UnixTime) {
            return push(errors, path, "Invalid date");
        }
    }

    let Some(kind) = info.types.iter().copied().find(|kind| conforms(value, *kind)) else {
        if !info.types.is_empty() {
            let expected: Vec<&str> = info.types.iter().map(|kind| kind.as_str()).collect();
            push(
                errors,
                path,
                format!("Expected {}, received {}", expected.join(" | "), value.type_name()),
            );
        }
        return;
    };

    match (kind, value) {
        (PrimitiveKind::Object, FormValue::Object(object)) => {
            check_object(object, schema_of_kind(schema, kind), path, errors);
        }
        (PrimitiveKind::Array | PrimitiveKind::Set, FormValue::Array(items) | FormValue::Set(items)) => {
            if let Some(Items::Single(item_schema)) = schema_of_kind(schema, kind)
                .node()
                .and_then(|node| node.items.as_ref())
            {
                for (index, item) in items.iter().enumerate() {
                    check_value(item, item_schema, &join(path, &index.to_string()), errors);
                }
            }
        }
        _ => {}
    }
}

/// The `anyOf` member declaring `kind`, or `schema` itself.
fn schema_of_kind(schema: &Schema, kind: PrimitiveKind) -> &Schema {
    let Some(node) = schema.node() else {
        return schema;
    };
    node.any_of
        .as_deref()
        .and_then(|members| {
            members.iter().find(|member| {
                inspect(member, "", false, |_| Ok(()))
                    .map(|info| info.has(kind))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(schema)
}

fn conforms(value: &FormValue, kind: PrimitiveKind) -> bool {
    match kind {
        PrimitiveKind::Any => true,
        PrimitiveKind::String => matches!(value, FormValue::String(_)),
        PrimitiveKind::Integer => match value {
            FormValue::Integer(_) => true,
            FormValue::Number(n) => n.is_finite() && n.fract() == 0.0,
            _ => false,
        },
        PrimitiveKind::Number => match value {
            FormValue::Integer(_) => true,
            FormValue::Number(n) => !n.is_nan(),
            _ => false,
        },
        PrimitiveKind::Boolean => matches!(value, FormValue::Bool(_)),
        PrimitiveKind::UnixTime => matches!(value, FormValue::Date(_)),
        PrimitiveKind::BigInt => matches!(value, FormValue::BigInt(_)),
        PrimitiveKind::Symbol => matches!(value, FormValue::Symbol(_)),
        PrimitiveKind::Array => matches!(value, FormValue::Array(_)),
        PrimitiveKind::Set => matches!(value, FormValue::Set(_)),
        PrimitiveKind::Object => matches!(value, FormValue::Object(_)),
        PrimitiveKind::Null => value.is_null(),
        PrimitiveKind::Undefined => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaNode;

    fn profile_schema() -> Schema {
        SchemaNode::object([
            ("name", Schema::kind("string")),
            ("age", Schema::kind("integer")),
            ("tags", Schema::array_of(Schema::kind("string"))),
            (
                "address",
                SchemaNode::object([("city", Schema::kind("string"))])
                    .with_required(["city"])
                    .into(),
            ),
        ])
        .with_required(["name"])
        .into()
    }

    fn object(pairs: Vec<(&str, FormValue)>) -> FormObject {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[tokio::test]
    async fn valid_data_passes() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        let data = object(vec![
            ("name", FormValue::from("Ada")),
            ("age", FormValue::Integer(36)),
            ("tags", FormValue::Array(vec![FormValue::from("math")])),
        ]);
        let outcome = adapter.validate(&data).await;
        assert!(outcome.valid, "{:?}", outcome.errors);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn missing_required_key_is_reported() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        let outcome = adapter.validate(&FormObject::new()).await;
        assert!(!outcome.valid);
        assert_eq!(outcome.errors["name"], vec!["Required".to_string()]);
    }

    #[test]
    fn nan_is_not_an_integer() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        let data = object(vec![("name", FormValue::from("Ada")), ("age", FormValue::nan())]);
        let outcome = adapter.check(&data);
        assert_eq!(
            outcome.errors["age"],
            vec!["Expected integer, received number".to_string()]
        );
    }

    #[test]
    fn nested_paths_are_dotted() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        let data = object(vec![
            ("name", FormValue::from("Ada")),
            ("tags", FormValue::Array(vec![FormValue::from("ok"), FormValue::Integer(3)])),
            ("address", FormValue::Object(FormObject::new())),
        ]);
        let outcome = adapter.check(&data);
        assert!(outcome.errors.contains_key("tags.1"));
        assert_eq!(outcome.errors["address.city"], vec!["Required".to_string()]);
    }

    #[test]
    fn null_requires_nullable_schema() {
        let schema: Schema = SchemaNode::object([
            ("strict", Schema::kind("string")),
            ("loose", SchemaNode::of_types(&["string", "null"]).into()),
        ])
        .into();
        let adapter = JsonSchemaAdapter::new(schema);
        let data = object(vec![("strict", FormValue::Null), ("loose", FormValue::Null)]);
        let outcome = adapter.check(&data);
        assert!(outcome.errors.contains_key("strict"));
        assert!(!outcome.errors.contains_key("loose"));
    }

    #[test]
    fn open_schema_accepts_extra_keys() {
        let schema: Schema = SchemaNode::object([("n", Schema::kind("integer"))])
            .with_additional_properties(Schema::Bool(true))
            .into();
        let adapter = JsonSchemaAdapter::new(schema);
        let data = object(vec![("n", FormValue::Integer(1)), ("extra", FormValue::from("x"))]);
        let outcome = adapter.check(&data);
        assert!(outcome.valid, "{:?}", outcome.errors);
    }

    #[test]
    fn true_property_schema_accepts_anything() {
        let schema: Schema = SchemaNode::object([("free", Schema::Bool(true))]).into();
        let adapter = JsonSchemaAdapter::new(schema);
        let data = object(vec![("free", FormValue::Integer(3))]);
        assert!(adapter.check(&data).valid);
    }

    #[test]
    fn undeclared_keys_are_ignored() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        let data = object(vec![("name", FormValue::from("Ada")), ("extra", FormValue::Integer(1))]);
        assert!(adapter.check(&data).valid);
    }

    #[test]
    fn schema_accessor_returns_schema() {
        let adapter = JsonSchemaAdapter::new(profile_schema());
        assert_eq!(ValidationAdapter::schema(&adapter), &profile_schema());
    }
}
