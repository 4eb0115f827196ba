//! Typed CRUD over JSON REST APIs.
//!
//! # Overview
//! Application models implement a few small traits (`Resource`,
//! `Identified`, `ToAttributes`, and any of `Creatable`, `Readable`,
//! `Updatable`, `Deletable`, `Enumerable`) and gain create / read / update /
//! delete / list against `{base_url}{PATH}[/{id}]`, with optional JSON
//! envelope unwrapping.
//!
//! # Design
//! - `Client` owns the configuration (base URL, default headers, logging
//!   hooks) and an injected `Transport`. There is no global state.
//! - Every failure, whether no response, an HTTP status of 300 or above, or a
//!   body that does not decode, resolves to one `ApiError` shape.
//! - `Request` exposes a call as an `InFlight` future with a
//!   `RequestHandle` for pause, resume, and cancel.
//! - Attribute values are tri-state (`Absent`, `Null`, `Value`) so partial
//!   updates and explicit clears are distinguishable.

pub mod attributes;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod resource;
pub mod transport;

pub use attributes::{Attribute, Attributes, FromJson, ToAttributes};
pub use client::Client;
pub use config::Config;
pub use error::{ApiError, ErrorKind, NO_RESPONSE_STATUS};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Outcome, Params};
pub use request::{InFlight, Request, RequestHandle};
pub use resource::{
    Creatable, Crud, Deletable, Enumerable, Identified, Okay, Readable, Resource, Updatable,
};
pub use transport::{ReqwestTransport, Transport, TransportError};
