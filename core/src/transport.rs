//! The HTTP capability the client depends on.
//!
//! # Design
//! `Transport` is the single seam between this crate and the network. It
//! takes a resolved `HttpRequest` and returns either a response (any status
//! code) or a `TransportError` when no response was received at all. Status
//! interpretation belongs to the client, so implementations must return 4xx
//! and 5xx responses as `Ok`.
//!
//! `ReqwestTransport` is the default implementation. Tests substitute their
//! own in-memory transport.

use async_trait::async_trait;
use serde_json::Value;

use crate::http::{HttpRequest, HttpResponse, Params};

/// A call that produced no HTTP response: DNS failure, refused connection,
/// timeout, TLS error and the like.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Platform-native error code, when the transport has one.
    pub code: Option<i32>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let code = err.status().map(|status| i32::from(status.as_u16()));
        Self {
            message: err.to_string(),
            code,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP round-trip.
    ///
    /// For GET, `request.params` must be encoded into the query string; for
    /// every other method they are sent as a JSON body.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(params) = &request.params {
            builder = if request.method.uses_query() {
                builder.query(&query_pairs(params))
            } else {
                builder.json(params)
            };
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Flatten parameters into query pairs.
///
/// Nested objects use `key[sub]` and arrays use `key[]`, matching what
/// Rails-style servers expect. Nulls encode as an empty value.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_pairs(&mut pairs, key.clone(), value);
    }
    pairs
}

fn push_pairs(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (sub, nested) in map {
                push_pairs(pairs, format!("{key}[{sub}]"), nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                push_pairs(pairs, format!("{key}[]"), item);
            }
        }
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Null => pairs.push((key, String::new())),
        other => pairs.push((key, other.to_string())),
    }
}
