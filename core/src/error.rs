//! The normalized error every failed call resolves to.
//!
//! # Design
//! Callers branch on one shape only. A transport failure, an HTTP status of
//! 300 or above, a 2xx body that does not decode, attributes that cannot be
//! encoded, and a cancelled call all become an `ApiError`; `kind` tells them apart and `status` carries the
//! numeric HTTP status (or `NO_RESPONSE_STATUS` when nothing came back).
//!
//! Error bodies are inspected in a fixed order: a string `error` field, then
//! the first element of an `errors` list, then the first element of the
//! legacy `errorsList` list, then the status code's reason phrase. Only the
//! first list element is used.

use serde_json::Value;

use crate::http::{HttpRequest, HttpResponse, Outcome};
use crate::transport::TransportError;

/// Status reported when no HTTP response was received.
pub const NO_RESPONSE_STATUS: i32 = -1;

/// Status reported when a 2xx body could not be decoded.
pub const DECODE_FAILURE_STATUS: i32 = 600;

pub const DEFAULT_TITLE: &str = "Error";

pub const NO_JSON_RESULT: &str = "no JSON result";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received.
    Transport,
    /// A response arrived with status 300 or above.
    Http,
    /// A successful response whose body did not match the expected shape.
    Decode,
    /// The call was cancelled through its `RequestHandle`.
    Cancelled,
    /// Outgoing attributes could not be serialized; nothing was sent.
    Encode,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{title}: {detail}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: i32,
    pub title: String,
    pub detail: String,
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
}

impl ApiError {
    /// Normalize a finished call that did not succeed.
    ///
    /// A response with status below 300 is still turned into an `Http`
    /// error; callers only reach this after deciding the call failed.
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome.result {
            Ok(response) => Self::from_response(Some(outcome.request), response),
            Err(err) => Self::from_transport(Some(outcome.request), err),
        }
    }

    pub fn from_transport(request: Option<HttpRequest>, err: TransportError) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: err.code.unwrap_or(NO_RESPONSE_STATUS),
            title: DEFAULT_TITLE.to_string(),
            detail: err.message,
            request,
            response: None,
        }
    }

    pub fn from_response(request: Option<HttpRequest>, response: HttpResponse) -> Self {
        let (title, detail) = describe_failure(response.status, response.json().as_ref());
        Self {
            kind: ErrorKind::Http,
            status: i32::from(response.status),
            title,
            detail,
            request,
            response: Some(response),
        }
    }

    /// A 2xx call whose body could not be turned into the expected value.
    ///
    /// `reason` is the decoder's message; `None` means there was no body.
    pub fn decode(
        request: Option<HttpRequest>,
        response: Option<HttpResponse>,
        reason: Option<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Decode,
            status: DECODE_FAILURE_STATUS,
            title: DEFAULT_TITLE.to_string(),
            detail: reason.unwrap_or_else(|| NO_JSON_RESULT.to_string()),
            request,
            response,
        }
    }

    pub fn cancelled(request: Option<HttpRequest>) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            status: NO_RESPONSE_STATUS,
            title: DEFAULT_TITLE.to_string(),
            detail: "cancelled".to_string(),
            request,
            response: None,
        }
    }

    /// Attributes that failed to serialize before a call was issued.
    pub fn encode(err: serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Encode,
            status: NO_RESPONSE_STATUS,
            title: DEFAULT_TITLE.to_string(),
            detail: err.to_string(),
            request: None,
            response: None,
        }
    }

    pub fn is_encode(&self) -> bool {
        self.kind == ErrorKind::Encode
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }

    pub fn is_decode(&self) -> bool {
        self.kind == ErrorKind::Decode
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// True for an HTTP failure with exactly this status, e.g. 422.
    pub fn is_status(&self, status: u16) -> bool {
        self.kind == ErrorKind::Http && self.status == i32::from(status)
    }
}

/// Title and detail for a failed response, by body-shape precedence.
pub fn describe_failure(status: u16, body: Option<&Value>) -> (String, String) {
    let mut title = DEFAULT_TITLE.to_string();
    let mut detail = reason_phrase(status).to_string();

    let Some(body) = body else {
        return (title, detail);
    };

    if let Some(error) = body.get("error").and_then(Value::as_str) {
        detail = error.to_string();
    } else if let Some(first) = first_error(body, "errors").or_else(|| first_error(body, "errorsList")) {
        if let Some(t) = first.get("title").and_then(Value::as_str) {
            title = t.to_string();
        }
        if let Some(d) = first.get("detail").and_then(Value::as_str) {
            detail = d.to_string();
        }
    }

    (title, detail)
}

fn first_error<'a>(body: &'a Value, field: &str) -> Option<&'a Value> {
    body.get(field).and_then(Value::as_array).and_then(|list| list.first())
}

/// The standard reason phrase for a status code.
pub fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
}
