//! Framework request wrapper with a body that can be read only once.

use axum::body::{to_bytes, Body};
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Request, Uri};
use tracing::debug;

use formcast_core::{FormData, QueryError, UploadedFile};

/// Errors reading a form out of a request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body has already been consumed")]
    AlreadyConsumed,
    #[error("unsupported content type for form data: {0:?}")]
    UnsupportedContentType(String),
    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("form data is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed url-encoded body: {0}")]
    Malformed(#[from] QueryError),
}

/// An incoming request whose body is taken on first read.
///
/// Reading the body a second time yields [`BodyError::AlreadyConsumed`]
/// instead of an empty body.
#[derive(Debug)]
pub struct RequestEvent {
    parts: Parts,
    body: Option<Body>,
}

impl RequestEvent {
    #[must_use]
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// The `Content-Type` header, if present and valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }

    /// Takes the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] if the body was taken before.
    pub fn take_body(&mut self) -> Result<Body, BodyError> {
        self.body.take().ok_or(BodyError::AlreadyConsumed)
    }

    /// Reads the body as form data, buffering at most `limit` bytes.
    ///
    /// Accepts `multipart/form-data` and `application/x-www-form-urlencoded`
    /// bodies. The body is consumed unless the content type is unsupported.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] on a second read, or another
    /// [`BodyError`] when the body cannot be read or decoded.
    pub async fn form_data(&mut self, limit: usize) -> Result<FormData, BodyError> {
        if self.is_consumed() {
            return Err(BodyError::AlreadyConsumed);
        }
        let Some(content_type) = self.parts.headers.get(CONTENT_TYPE).cloned() else {
            return Err(BodyError::UnsupportedContentType(String::new()));
        };
        let media_type = essence(&content_type).map(str::to_ascii_lowercase);
        match media_type.as_deref() {
            Some("multipart/form-data") => {
                let body = self.take_body()?;
                read_multipart(body, content_type, limit).await
            }
            Some("application/x-www-form-urlencoded") => {
                let body = self.take_body()?;
                read_urlencoded(body, limit).await
            }
            _ => Err(BodyError::UnsupportedContentType(
                self.content_type().unwrap_or_default().to_string(),
            )),
        }
    }
}

impl From<Request<Body>> for RequestEvent {
    fn from(request: Request<Body>) -> Self {
        Self::new(request)
    }
}

/// Media type without parameters.
fn essence(value: &HeaderValue) -> Option<&str> {
    let text = value.to_str().ok()?;
    Some(text.split(';').next().unwrap_or(text).trim())
}

async fn read_multipart(
    body: Body,
    content_type: HeaderValue,
    limit: usize,
) -> Result<FormData, BodyError> {
    let bytes = to_bytes(body, limit).await?;
    let mut request = Request::new(Body::from(bytes));
    request.headers_mut().insert(CONTENT_TYPE, content_type.clone());

    let mut multipart = Multipart::from_request(request, &()).await.map_err(|rejection| {
        debug!(%rejection, "multipart extraction rejected");
        BodyError::UnsupportedContentType(content_type.to_str().unwrap_or_default().to_string())
    })?;

    let mut form = FormData::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let media_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        if file_name.is_some() {
            form.append(name, UploadedFile::new(file_name, media_type, data));
        } else {
            let text = String::from_utf8(data.to_vec()).map_err(|_| {
                debug!(field = %name, "multipart text field is not valid UTF-8");
                BodyError::InvalidUtf8
            })?;
            form.append(name, text);
        }
    }
    Ok(form)
}

async fn read_urlencoded(body: Body, limit: usize) -> Result<FormData, BodyError> {
    let bytes = to_bytes(body, limit).await?;
    let text = std::str::from_utf8(&bytes).map_err(|_| BodyError::InvalidUtf8)?;
    Ok(FormData::from_query(text)?)
}
