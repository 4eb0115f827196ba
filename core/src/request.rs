//! A single request with control over its in-flight lifetime.
//!
//! # Design
//! `Request` describes a call (url, params, header overrides) and can be
//! sent any number of times. Each `send*` takes a configuration snapshot,
//! resolves an immutable `HttpRequest`, and returns an `InFlight` future
//! together with a `RequestHandle`. The request logger runs when the future
//! first issues the call, so a call cancelled before that is never logged.
//!
//! The handle drives a small watch channel:
//! - `pause` lets the transport keep running but withholds the result;
//! - `resume` releases it;
//! - `cancel` drops the transport future and resolves the call as a
//!   `Cancelled` error. A cancelled call never reports success and never
//!   reaches the response logger.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::attributes::FromJson;
use crate::client::Client;
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Outcome, Params};
use crate::resource::Okay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Running,
    Paused,
    Cancelled,
}

/// Pause, resume, or cancel one issued call. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    control: Arc<watch::Sender<Control>>,
}

impl RequestHandle {
    fn new() -> (Self, watch::Receiver<Control>) {
        let (tx, rx) = watch::channel(Control::Running);
        (
            Self {
                control: Arc::new(tx),
            },
            rx,
        )
    }

    pub fn pause(&self) {
        self.control.send_if_modified(|state| {
            if *state == Control::Running {
                *state = Control::Paused;
                return true;
            }
            false
        });
    }

    pub fn resume(&self) {
        self.control.send_if_modified(|state| {
            if *state == Control::Paused {
                *state = Control::Running;
                return true;
            }
            false
        });
    }

    /// Cancellation is final; later `resume` calls have no effect.
    pub fn cancel(&self) {
        self.control.send_replace(Control::Cancelled);
    }

    pub fn is_paused(&self) -> bool {
        *self.control.borrow() == Control::Paused
    }

    pub fn is_cancelled(&self) -> bool {
        *self.control.borrow() == Control::Cancelled
    }
}

/// A call in progress. Resolves exactly once.
#[must_use = "an InFlight call does nothing unless awaited"]
pub struct InFlight<T> {
    handle: RequestHandle,
    future: BoxFuture<'static, Result<T, ApiError>>,
}

impl<T: Send + 'static> InFlight<T> {
    pub fn handle(&self) -> RequestHandle {
        self.handle.clone()
    }

    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    fn and_then<U, F>(self, f: F) -> InFlight<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, ApiError> + Send + 'static,
    {
        InFlight {
            handle: self.handle,
            future: self.future.map(|result| result.and_then(f)).boxed(),
        }
    }
}

impl<T> Future for InFlight<T> {
    type Output = Result<T, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// A reusable description of one call. Built with `Client::request`.
#[derive(Debug, Clone)]
pub struct Request {
    client: Client,
    url: String,
    params: Option<Params>,
    headers: Option<BTreeMap<String, String>>,
    replace_headers: bool,
}

impl Request {
    pub(crate) fn new(client: Client, url: String) -> Self {
        Self {
            client,
            url,
            params: None,
            headers: None,
            replace_headers: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters for GET, JSON body for everything else.
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn maybe_params(mut self, params: Option<Params>) -> Self {
        self.params = params;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Per-call headers, merged over the client's defaults.
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .extend(headers);
        self
    }

    /// Send only the per-call headers, ignoring the client's defaults.
    pub fn replace_default_headers(mut self) -> Self {
        self.replace_headers = true;
        self
    }

    /// Raw parsed body. An empty success body resolves to `Ok(None)`.
    pub fn send(&self, method: HttpMethod) -> InFlight<Option<Value>> {
        self.dispatch(method).and_then(|resolved| Ok(resolved.body))
    }

    /// Decode one entity, unwrapped from `key` when given.
    pub fn send_for_object<T>(&self, method: HttpMethod, key: Option<&str>) -> InFlight<T>
    where
        T: FromJson + Send + 'static,
    {
        let key = key.map(str::to_string);
        self.dispatch(method)
            .and_then(move |resolved| resolved.object(key.as_deref()))
    }

    /// Decode a list of entities, unwrapped from `key` when given.
    pub fn send_for_collection<T>(&self, method: HttpMethod, key: Option<&str>) -> InFlight<Vec<T>>
    where
        T: FromJson + Send + 'static,
    {
        let key = key.map(str::to_string);
        self.dispatch(method)
            .and_then(move |resolved| resolved.collection(key.as_deref()))
    }

    /// Ignore the body; succeed whenever the call did.
    pub fn send_for_okay(&self, method: HttpMethod) -> InFlight<Okay> {
        self.dispatch(method).and_then(|_| Ok(Okay))
    }

    fn dispatch(&self, method: HttpMethod) -> InFlight<Resolved> {
        let config = self.client.config();
        let headers = if self.replace_headers {
            self.headers
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect()
        } else {
            config.merged_headers(self.headers.as_ref())
        };
        let request = HttpRequest {
            id: Uuid::new_v4(),
            method,
            url: self.url.clone(),
            headers,
            params: self.params.clone(),
        };

        let (handle, control) = RequestHandle::new();
        let transport = self.client.transport();
        let future = async move {
            let cancelled = *control.borrow() == Control::Cancelled;
            if cancelled {
                tracing::debug!(id = %request.id, "request cancelled before it was issued");
                return Err(ApiError::cancelled(Some(request)));
            }
            if let Some(log) = &config.request_log {
                log(&request);
            }
            tracing::debug!(id = %request.id, %method, url = %request.url, "sending request");

            let result = tokio::select! {
                biased;
                _ = wait_cancelled(control.clone()) => None,
                result = transport.send(&request) => Some(result),
            };
            let Some(result) = result else {
                tracing::debug!(id = %request.id, "request cancelled");
                return Err(ApiError::cancelled(Some(request)));
            };

            let mut control = control;
            if !wait_released(&mut control).await {
                tracing::debug!(id = %request.id, "request cancelled while paused");
                return Err(ApiError::cancelled(Some(request)));
            }

            let outcome = Outcome { request, result };
            report(&config, &outcome);
            resolve(outcome)
        }
        .boxed();

        InFlight { handle, future }
    }
}

async fn wait_cancelled(mut control: watch::Receiver<Control>) {
    let closed = control
        .wait_for(|state| *state == Control::Cancelled)
        .await
        .is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// Wait out a pause. Returns false when the call was cancelled instead.
async fn wait_released(control: &mut watch::Receiver<Control>) -> bool {
    let released = match control.wait_for(|state| *state != Control::Paused).await {
        Ok(state) => *state != Control::Cancelled,
        Err(_) => true,
    };
    released
}

fn report(config: &Config, outcome: &Outcome) {
    if let Some(log) = &config.response_log {
        log(outcome);
    } else if config.console_logging {
        let request = &outcome.request;
        match &outcome.result {
            Ok(response) => tracing::info!(
                target: "crude::console",
                id = %request.id,
                method = %request.method,
                url = %request.url,
                status = response.status,
                body = %response.body,
                "response"
            ),
            Err(err) => tracing::info!(
                target: "crude::console",
                id = %request.id,
                method = %request.method,
                url = %request.url,
                error = %err,
                "no response"
            ),
        }
    }
}

fn resolve(outcome: Outcome) -> Result<Resolved, ApiError> {
    match outcome.result {
        Ok(response) if response.is_success() => {
            tracing::debug!(id = %outcome.request.id, status = response.status, "request succeeded");
            let body = response.json();
            Ok(Resolved {
                request: outcome.request,
                response,
                body,
            })
        }
        result => {
            let err = ApiError::from_outcome(Outcome {
                request: outcome.request,
                result,
            });
            tracing::warn!(status = err.status, detail = %err.detail, "request failed");
            Err(err)
        }
    }
}

/// A successful call, kept whole so decode failures can carry context.
struct Resolved {
    request: HttpRequest,
    response: HttpResponse,
    body: Option<Value>,
}

impl Resolved {
    fn decode_error(&self, reason: Option<String>) -> ApiError {
        ApiError::decode(
            Some(self.request.clone()),
            Some(self.response.clone()),
            reason,
        )
    }

    fn envelope(&self, key: Option<&str>) -> Result<Value, ApiError> {
        let Some(body) = &self.body else {
            return Err(self.decode_error(None));
        };
        match key {
            None => Ok(body.clone()),
            Some(key) => body
                .get(key)
                .cloned()
                .ok_or_else(|| self.decode_error(Some(format!("missing `{key}` in response")))),
        }
    }

    fn object<T: FromJson>(&self, key: Option<&str>) -> Result<T, ApiError> {
        let value = self.envelope(key)?;
        T::from_json(value).map_err(|err| self.decode_error(Some(err.to_string())))
    }

    fn collection<T: FromJson>(&self, key: Option<&str>) -> Result<Vec<T>, ApiError> {
        let Value::Array(items) = self.envelope(key)? else {
            return Err(self.decode_error(Some("expected a JSON array".to_string())));
        };
        items
            .into_iter()
            .map(|item| T::from_json(item).map_err(|err| self.decode_error(Some(err.to_string()))))
            .collect()
    }
}
