//! JSON-Schema-like shape descriptions consumed by the coercion core.
//!
//! A [`Schema`] is produced by a validation-library bridge (see
//! [`crate::adapter`]) and only carries what form coercion needs: type tags,
//! unions, object properties, array items, and the required set. Keyword
//! names follow JSON Schema so bridges can emit plain JSON.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A schema position: either the boolean degenerate form or a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    /// `true` / `false` schema. Carries no type information.
    Bool(bool),
    Node(Box<SchemaNode>),
}

impl Schema {
    /// Shorthand for a node declaring a single type tag.
    #[must_use]
    pub fn kind(tag: &str) -> Self {
        SchemaNode::of_type(tag).into()
    }

    /// Shorthand for an array node with a single item schema.
    #[must_use]
    pub fn array_of(items: impl Into<Schema>) -> Self {
        SchemaNode::of_type("array").with_items(items).into()
    }

    #[must_use]
    pub fn node(&self) -> Option<&SchemaNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Bool(_) => None,
        }
    }
}

impl From<SchemaNode> for Schema {
    fn from(node: SchemaNode) -> Self {
        Self::Node(Box::new(node))
    }
}

/// `type` keyword: a single tag or a list of tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Single(String),
    Union(Vec<String>),
}

impl TypeDecl {
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        match self {
            Self::Single(tag) => vec![tag.as_str()],
            Self::Union(tags) => tags.iter().map(String::as_str).collect(),
        }
    }
}

/// `items` keyword: one schema for every element, or a positional list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    List(Vec<Schema>),
    Single(Schema),
}

/// Structural description of one field or of the whole form object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Declared type tag(s).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_decl: Option<TypeDecl>,
    /// Format hint. Conversion formats (`unix-time`, `bigint`, `int64`,
    /// `symbol`, `set`, `any`) replace the declared type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Union members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,
    /// Object properties in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Element schema(s) for arrays and sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    /// Property names that must be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Whether (and how) undeclared keys are accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Schema>,
    /// Marks an array whose elements must be distinct (coerced as a set).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<serde_json::Value>,
}

impl SchemaNode {
    #[must_use]
    pub fn of_type(tag: &str) -> Self {
        Self {
            type_decl: Some(TypeDecl::Single(tag.to_string())),
            ..Self::default()
        }
    }

    /// Node whose `type` is a list of tags.
    #[must_use]
    pub fn of_types(tags: &[&str]) -> Self {
        Self {
            type_decl: Some(TypeDecl::Union(
                tags.iter().map(|tag| (*tag).to_string()).collect(),
            )),
            ..Self::default()
        }
    }

    /// Node whose members are listed under `anyOf`.
    #[must_use]
    pub fn any_of(members: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            any_of: Some(members.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Object node with the given properties, none of them required.
    #[must_use]
    pub fn object<K: Into<String>>(properties: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Self {
            type_decl: Some(TypeDecl::Single(PrimitiveKind::Object.as_str().to_string())),
            properties: Some(
                properties
                    .into_iter()
                    .map(|(key, schema)| (key.into(), schema))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_required<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.required = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: impl Into<Schema>) -> Self {
        self.items = Some(Items::Single(items.into()));
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    #[must_use]
    pub fn with_additional_properties(mut self, schema: impl Into<Schema>) -> Self {
        self.additional_properties = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_unique_items(mut self) -> Self {
        self.unique_items = true;
        self
    }

    /// Whether undeclared keys should be coerced instead of ignored.
    #[must_use]
    pub fn allows_additional(&self) -> bool {
        !matches!(self.additional_properties, None | Some(Schema::Bool(false)))
    }

    /// Whether `key` is listed in the required set.
    #[must_use]
    pub fn is_required(&self, key: &str) -> bool {
        self.required.iter().any(|name| name == key)
    }

    /// Schema constraining `key`: the declared property, else an
    /// `additionalProperties` schema node.
    ///
    /// `None` when the key is undeclared and either rejected or
    /// unconstrained (`additionalProperties: true`); use
    /// [`SchemaNode::allows_additional`] to tell the two apart.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Schema> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(key))
            .or(match &self.additional_properties {
                Some(schema @ Schema::Node(_)) => Some(schema),
                _ => None,
            })
    }

    /// Declared property names in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .flat_map(|props| props.keys().map(String::as_str))
    }
}

/// Recognised primitive kind tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    /// A date, carried on the wire as text.
    UnixTime,
    BigInt,
    Symbol,
    Array,
    Set,
    Object,
    Any,
    Null,
    Undefined,
}

impl PrimitiveKind {
    /// Formats that replace the declared type of a node.
    pub const CONVERSION_FORMATS: [&'static str; 6] =
        ["unix-time", "bigint", "int64", "symbol", "set", "any"];

    /// Parses a type tag, returning `None` for anything unrecognised.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "unix-time" => Self::UnixTime,
            "bigint" | "int64" => Self::BigInt,
            "symbol" => Self::Symbol,
            "array" => Self::Array,
            "set" => Self::Set,
            "object" => Self::Object,
            "any" => Self::Any,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::UnixTime => "unix-time",
            Self::BigInt => "bigint",
            Self::Symbol => "symbol",
            Self::Array => "array",
            Self::Set => "set",
            Self::Object => "object",
            Self::Any => "any",
            Self::Null => "null",
            Self::Undefined => "undefined",
        }
    }

    /// Kinds that can never be derived from a single string.
    #[must_use]
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Array | Self::Set | Self::Object)
    }

    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Array | Self::Set)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
