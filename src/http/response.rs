//! Response descriptors and rendering.
//!
//! # Responsibilities
//! - Describe a response as status + headers + optional body
//! - Merge header sources with last-wins, case-insensitive semantics
//! - Derive Content-Type and Content-Length from the body
//! - Strip headers the transport is configured to suppress
//!
//! # Design Decisions
//! - Headers render in a stable, name-sorted order
//! - Defaults come first so any later source may override them
//! - Invalid header names/values are skipped with a warning, never panic

use std::collections::BTreeMap;

use axum::{
    body::{Body, Bytes},
    http::{HeaderName, HeaderValue, Response, StatusCode},
};

use crate::config::TransportConfig;

const TEXT_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Response body variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn content_type(&self) -> &'static str {
        match self {
            Self::Binary(_) => BINARY_CONTENT_TYPE,
            Self::Empty | Self::Text(_) => TEXT_CONTENT_TYPE,
        }
    }

    fn into_body(self) -> Body {
        match self {
            Self::Empty => Body::empty(),
            Self::Text(text) => Body::from(text),
            Self::Binary(bytes) => Body::from(bytes),
        }
    }
}

/// Case-insensitive header collection, sorted by lowercase name.
///
/// Inserting a name that already exists replaces the earlier value but
/// keeps the newest spelling of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: BTreeMap<String, (String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    /// Apply every header of `other` on top of this set.
    pub fn merge(&mut self, other: &HeaderSet) {
        for (key, entry) in &other.entries {
            self.entries.insert(key.clone(), entry.clone());
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&name.to_ascii_lowercase());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// What the transport should send back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    status: StatusCode,
    headers: HeaderSet,
    body: ResponseBody,
}

impl ResponseDescriptor {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderSet::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Transport-level error (bad body, unsupported method, ...).
    ///
    /// Uses the configured error body so the default server error page
    /// never leaks.
    pub fn transport_error(status: StatusCode, transport: &TransportConfig) -> Self {
        Self::new(status).with_body(ResponseBody::text(transport.error_body.clone()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: &HeaderSet) -> Self {
        self.headers.merge(headers);
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Final header set: body-derived defaults, then explicit headers,
    /// minus suppressed names.
    pub fn effective_headers(&self, transport: &TransportConfig) -> HeaderSet {
        let mut merged = HeaderSet::new();
        merged.insert("Content-Type", self.body.content_type());
        merged.insert("Content-Length", self.body.len().to_string());
        merged.merge(&self.headers);
        for name in &transport.suppress_headers {
            merged.remove(name);
        }
        merged
    }

    /// Render into an HTTP response.
    pub fn render(self, transport: &TransportConfig) -> Response<Body> {
        let headers = self.effective_headers(transport);
        let mut response = Response::new(self.body.into_body());
        *response.status_mut() = self.status;

        let map = response.headers_mut();
        for (name, value) in headers.iter() {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid response header"),
            }
        }
        response
    }
}
