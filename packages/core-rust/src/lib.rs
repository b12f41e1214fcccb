//! `formcast` core: schema-driven coercion of submitted form data.
//!
//! Form submissions arrive as flat text key/value pairs. Given a
//! JSON-Schema-like description of the expected object, this crate turns
//! them into typed [`FormValue`]s, or decodes an escaped payload carrying
//! the whole object when the client sent one.

pub mod adapter;
pub mod assemble;
pub mod coerce;
pub mod error;
pub mod escaped;
pub mod form_data;
pub mod inspect;
pub mod options;
pub mod parse;
pub mod schema;
pub mod value;

pub use adapter::{FieldErrors, JsonSchemaAdapter, ValidationAdapter, ValidationOutcome};
pub use error::FormError;
pub use escaped::EscapedError;
pub use form_data::{FormData, FormEntry, QueryError};
pub use inspect::{inspect, SchemaInfo};
pub use options::{ParseOptions, ReservedFields};
pub use parse::{parse_form_data, ParsedForm};
pub use schema::{PrimitiveKind, Schema, SchemaNode};
pub use value::{FormObject, FormValue, Symbol, UploadedFile};

