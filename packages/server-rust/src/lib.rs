//! `formcast` server: turns requests, URLs, and raw form payloads into
//! coerced form data using the `formcast-core` engine.

pub mod config;
pub mod dispatch;
pub mod request;
pub mod source;
pub mod telemetry;
pub mod validate;

pub use config::FormConfig;
pub use dispatch::{parse_request, ParseError};
pub use request::{BodyError, RequestEvent};
pub use source::{classify, FormSource, SourceKind};
pub use validate::{validate_form, FormValidation};

