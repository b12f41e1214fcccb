//! Raw inputs accepted by the dispatcher.

use http::Uri;

use formcast_core::{FormData, FormObject};

use crate::request::RequestEvent;

/// Any input a form can be parsed from.
#[derive(Debug)]
pub enum FormSource<'a> {
    /// An already-decoded form payload.
    FormData(FormData),
    /// A URL whose query string carries the fields.
    Url(Uri),
    /// A bare query string, with or without the leading `?`.
    Query(String),
    /// A request whose body is read as form data. Borrowed so the caller
    /// keeps the request (and sees it consumed) afterwards.
    Request(&'a mut RequestEvent),
    /// Data that is already structured; never treated as a submission.
    Object(Option<FormObject>),
}

/// Classification of a [`FormSource`], in dispatch precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    FormData,
    Url,
    Request,
    Object,
}

impl FormSource<'_> {
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query(query.into())
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        classify(self)
    }
}

/// Classifies `source`. URLs and bare query strings share [`SourceKind::Url`].
#[must_use]
pub fn classify(source: &FormSource<'_>) -> SourceKind {
    match source {
        FormSource::FormData(_) => SourceKind::FormData,
        FormSource::Url(_) | FormSource::Query(_) => SourceKind::Url,
        FormSource::Request(_) => SourceKind::Request,
        FormSource::Object(_) => SourceKind::Object,
    }
}

impl From<FormData> for FormSource<'_> {
    fn from(form: FormData) -> Self {
        Self::FormData(form)
    }
}

impl From<Uri> for FormSource<'_> {
    fn from(uri: Uri) -> Self {
        Self::Url(uri)
    }
}

impl<'a> From<&'a mut RequestEvent> for FormSource<'a> {
    fn from(event: &'a mut RequestEvent) -> Self {
        Self::Request(event)
    }
}

impl From<FormObject> for FormSource<'_> {
    fn from(object: FormObject) -> Self {
        Self::Object(Some(object))
    }
}

impl From<Option<FormObject>> for FormSource<'_> {
    fn from(object: Option<FormObject>) -> Self {
        Self::Object(object)
    }
}
