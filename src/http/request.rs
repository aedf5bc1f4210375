//! Request head extraction and body decoding.
//!
//! # Responsibilities
//! - Capture what modules need from a request (method, path, headers)
//! - Decode POST bodies into a field → value mapping
//!
//! # Design Decisions
//! - Only `multipart/form-data` and `application/x-www-form-urlencoded`
//!   are accepted; anything else is a caller-visible error
//! - Body size is bounded by the `DefaultBodyLimit` installed by the server
//! - Field contents never appear in Debug output

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, Method, Request, StatusCode},
};
use thiserror::Error;

const MULTIPART: &str = "multipart/form-data";
const URLENCODED: &str = "application/x-www-form-urlencoded";

/// The parts of a request a module may inspect.
#[derive(Clone)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub source: String,
}

impl RequestHead {
    pub fn from_parts(parts: &Parts, source: &str) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            source: source.to_string(),
        }
    }

    /// Bare head for a method and path, mostly useful in tests.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            source: String::new(),
        }
    }
}

impl fmt::Debug for RequestHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHead")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Decoded form fields. A name may carry several values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: BTreeMap<Vec<u8>, Vec<Bytes>>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Bytes>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&Bytes> {
        self.fields.get(name.as_ref()).and_then(|values| values.first())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse an `application/x-www-form-urlencoded` body. Blank values are kept.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut fields = Self::new();
        for (name, value) in url::form_urlencoded::parse(body) {
            fields.insert(name.into_owned().into_bytes(), value.into_owned());
        }
        fields
    }
}

impl fmt::Debug for FormFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, values) in &self.fields {
            let sizes: Vec<usize> = values.iter().map(Bytes::len).collect();
            map.entry(&String::from_utf8_lossy(name), &sizes);
        }
        map.finish()
    }
}

/// Errors raised while decoding a request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("malformed request body: {0}")]
    Malformed(String),

    #[error("request body exceeds the configured limit")]
    TooLarge,
}

impl DecodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn from_rejection(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Malformed(text)
        }
    }
}

/// Lowercased media type without parameters.
fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Decode a POST body into form fields.
pub async fn decode_form(request: Request<Body>) -> Result<FormFields, DecodeError> {
    match media_type(request.headers()).as_str() {
        MULTIPART => decode_multipart(request).await,
        URLENCODED => {
            let body = Bytes::from_request(request, &())
                .await
                .map_err(|r| DecodeError::from_rejection(r.status(), r.body_text()))?;
            Ok(FormFields::from_urlencoded(&body))
        }
        other => Err(DecodeError::UnsupportedContentType(other.to_string())),
    }
}

async fn decode_multipart(request: Request<Body>) -> Result<FormFields, DecodeError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|r| DecodeError::from_rejection(r.status(), r.body_text()))?;

    let mut fields = FormFields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DecodeError::from_rejection(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().as_bytes().to_vec();
        let value = field
            .bytes()
            .await
            .map_err(|e| DecodeError::from_rejection(e.status(), e.body_text()))?;
        fields.insert(name, value);
    }
    Ok(fields)
}
