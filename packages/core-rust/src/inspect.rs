//! Schema type inspection.
//!
//! Collapses a schema node's `type`, `format`, `anyOf`, `uniqueItems`, and
//! `const` keywords into a flat, ordered set of [`PrimitiveKind`]s plus
//! optionality and nullability flags.

use crate::error::FormError;
use crate::schema::{Items, PrimitiveKind, Schema, SchemaNode};

/// Derived per-field view of a schema node. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaInfo<'a> {
    /// Effective kinds with `null`/`undefined` removed, in declaration order.
    pub types: Vec<PrimitiveKind>,
    pub is_optional: bool,
    pub is_nullable: bool,
    /// The inspected node.
    pub node: &'a SchemaNode,
    /// Non-null `anyOf` members, if the node declares a union.
    pub union: Vec<&'a Schema>,
}

impl<'a> SchemaInfo<'a> {
    /// The single resolved kind, or `None` if zero or several remain.
    #[must_use]
    pub fn single_kind(&self) -> Option<PrimitiveKind> {
        match self.types.as_slice() {
            [kind] => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn has(&self, kind: PrimitiveKind) -> bool {
        self.types.contains(&kind)
    }

    /// Whether the field holds an array or a set.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.types.iter().any(|kind| kind.is_collection())
    }

    /// The single element schema of an array or set field.
    ///
    /// Falls back to the items of a lone `anyOf` member, so `T[] | null`
    /// style unions resolve.
    ///
    /// # Errors
    ///
    /// Returns a schema error if no items are declared, several positional
    /// item schemas are declared, or the item schema is a boolean.
    pub fn item_schema(&self, field: &str) -> Result<&'a Schema, FormError> {
        let items = self.node.items.as_ref().or_else(|| match self.union.as_slice() {
            [member] => member.node().and_then(|node| node.items.as_ref()),
            _ => None,
        });

        let item = match items {
            Some(Items::Single(schema)) => Some(schema),
            Some(Items::List(list)) if list.len() == 1 => list.first(),
            _ => None,
        };

        match item {
            Some(schema @ Schema::Node(_)) => Ok(schema),
            _ => Err(FormError::schema(
                field,
                "Arrays must have a single \"items\" property that defines its type.",
            )),
        }
    }
}

/// Inspects `schema` for `field`.
///
/// `implied_optional` marks the field optional regardless of its own
/// declaration (typically: absent from the parent's required set).
/// `on_union` is called with the effective kinds when more than one
/// concrete kind remains after stripping `null`/`undefined`; returning an
/// error aborts inspection.
///
/// # Errors
///
/// Returns a schema error for boolean schemas, an unsupported-kind error
/// for unrecognised type tags, or whatever `on_union` returns.
pub fn inspect<'a, F>(
    schema: &'a Schema,
    field: &str,
    implied_optional: bool,
    on_union: F,
) -> Result<SchemaInfo<'a>, FormError>
where
    F: FnOnce(&[PrimitiveKind]) -> Result<(), FormError>,
{
    let node = node_of(schema, field)?;
    let all = schema_types(node, field)?;

    let is_nullable = all.contains(&PrimitiveKind::Null);
    let is_undefined = all.contains(&PrimitiveKind::Undefined);
    let types: Vec<PrimitiveKind> = all
        .into_iter()
        .filter(|kind| !matches!(kind, PrimitiveKind::Null | PrimitiveKind::Undefined))
        .collect();

    let union = node
        .any_of
        .iter()
        .flatten()
        .filter(|member| !is_null_member(member))
        .collect();

    if types.len() > 1 {
        on_union(&types)?;
    }

    Ok(SchemaInfo {
        types,
        is_optional: implied_optional || is_undefined,
        is_nullable,
        node,
        union,
    })
}

/// The union policy used for form data: any union is a schema error.
///
/// # Errors
///
/// Always returns a schema error naming `field`.
pub fn reject_union(field: &str) -> impl FnOnce(&[PrimitiveKind]) -> Result<(), FormError> + '_ {
    move |_| {
        Err(FormError::schema(
            field,
            "Unions are only supported when the form is submitted as an escaped payload.",
        ))
    }
}

fn node_of<'a>(schema: &'a Schema, field: &str) -> Result<&'a SchemaNode, FormError> {
    schema
        .node()
        .ok_or_else(|| FormError::schema(field, "Schema cannot be defined as boolean"))
}

fn is_null_member(schema: &Schema) -> bool {
    schema.node().is_some_and(|node| {
        node.type_decl
            .as_ref()
            .is_some_and(|decl| decl.tags() == ["null"])
    })
}

/// Every kind a node can take, including `null`/`undefined`, deduplicated.
fn schema_types(node: &SchemaNode, field: &str) -> Result<Vec<PrimitiveKind>, FormError> {
    let conversion = node
        .format
        .as_deref()
        .filter(|format| PrimitiveKind::CONVERSION_FORMATS.contains(format));

    let mut tags: Vec<&str> = match &node.type_decl {
        Some(decl) => decl
            .tags()
            .into_iter()
            .map(|tag| match conversion {
                Some(format) if tag != "null" => format,
                _ => tag,
            })
            .collect(),
        None => conversion.into_iter().collect(),
    };

    if tags.is_empty() && node.any_of.is_none() {
        if let Some(tag) = node.const_value.as_ref().and_then(const_tag) {
            tags.push(tag);
        }
    }

    let mut kinds = Vec::with_capacity(tags.len());
    for tag in tags {
        let kind = PrimitiveKind::from_tag(tag).ok_or_else(|| FormError::UnsupportedKind {
            field: field.to_string(),
            kind: tag.to_string(),
        })?;
        kinds.push(kind);
    }

    if let Some(members) = &node.any_of {
        for member in members {
            kinds.extend(schema_types(node_of(member, field)?, field)?);
        }
    }

    if node.unique_items {
        for kind in &mut kinds {
            if *kind == PrimitiveKind::Array {
                *kind = PrimitiveKind::Set;
            }
        }
    }

    let mut unique = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !unique.contains(&kind) {
            unique.push(kind);
        }
    }
    Ok(unique)
}

fn const_tag(value: &serde_json::Value) -> Option<&'static str> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(_) => Some("boolean"),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        serde_json::Value::Number(_) => Some("number"),
        serde_json::Value::String(_) => Some("string"),
        serde_json::Value::Array(_) => Some("array"),
        serde_json::Value::Object(_) => Some("object"),
    }
}
