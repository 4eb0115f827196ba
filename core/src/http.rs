//! HTTP request and response descriptors.
//!
//! # Design
//! Requests and responses are plain data. `Client` builds an `HttpRequest`
//! from its configuration snapshot, hands it to a `Transport`, and receives
//! an `HttpResponse` (or a `TransportError` when nothing came back). The
//! pair is bundled into an `Outcome`, which is what the response logger sees
//! and what the error normalizer consumes.
//!
//! All fields use owned types so descriptors can be logged, cloned into
//! errors, and moved across tasks without lifetime concerns.

use std::fmt;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::transport::TransportError;

/// Query or body parameters: string keys to arbitrary JSON values.
pub type Params = Map<String, Value>;

/// HTTP method for a request. Restricted to the four verbs CRUD needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the query string rather than the body.
    pub fn uses_query(self) -> bool {
        self == HttpMethod::Get
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for ::http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => ::http::Method::GET,
            HttpMethod::Post => ::http::Method::POST,
            HttpMethod::Put => ::http::Method::PUT,
            HttpMethod::Delete => ::http::Method::DELETE,
        }
    }
}

/// A fully resolved request, immutable once issued.
///
/// `headers` already contains the defaults merged with any per-call
/// overrides, sorted by name. `id` correlates log lines for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub id: Uuid,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Option<Params>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialized JSON body, or `None` for GET and for calls without params.
    pub fn json_body(&self) -> Option<String> {
        if self.method.uses_query() {
            return None;
        }
        self.params
            .as_ref()
            .map(|params| Value::Object(params.clone()).to_string())
    }
}

/// A response as received from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    /// The body parsed as JSON. Empty or non-JSON bodies yield `None`.
    pub fn json(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }
}

/// Everything known about one finished call.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub request: HttpRequest,
    pub result: Result<HttpResponse, TransportError>,
}

impl Outcome {
    pub fn status(&self) -> Option<u16> {
        self.result.as_ref().ok().map(|response| response.status)
    }
}
