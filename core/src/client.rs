//! The client context every call goes through.
//!
//! # Design
//! `Client` pairs a `Transport` with a swappable configuration snapshot.
//! Reconfiguring replaces the whole `Arc<Config>`; a call clones the current
//! `Arc` once when it is issued, so it never observes a half-applied change
//! and later changes only affect later calls. Clones share both the
//! transport and the configuration.
//!
//! The `execute*` methods are one-shot conveniences over `Request`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::attributes::FromJson;
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, Outcome, Params};
use crate::request::Request;
use crate::resource::Okay;
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<RwLock<Arc<Config>>>,
}

impl Client {
    /// A client that talks HTTP through `reqwest`.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The configuration new calls will use.
    pub fn config(&self) -> Arc<Config> {
        let guard = self
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Prefix for conventional resource paths.
    ///
    /// # Panics
    /// If no base URL has been configured. Issuing a request against an
    /// empty base URL is a programming error.
    pub fn base_url(&self) -> String {
        let config = self.config();
        assert!(
            !config.base_url.is_empty(),
            "base URL must be configured before making requests"
        );
        config.base_url.clone()
    }

    /// `{base_url}{path}`; used by every conventional resource path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) {
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = Config::clone(&guard);
        apply(&mut next);
        *guard = Arc::new(next);
    }

    /// Replace the whole configuration.
    pub fn configure(&self, config: Config) {
        self.update(|current| *current = config);
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        let base_url = base_url.into();
        self.update(|config| config.base_url = base_url);
    }

    /// Replace the default headers.
    pub fn set_headers(&self, headers: BTreeMap<String, String>) {
        self.update(|config| config.headers = headers);
    }

    /// Add to the default headers, overwriting existing names.
    pub fn merge_headers(&self, headers: BTreeMap<String, String>) {
        self.update(|config| config.headers.extend(headers));
    }

    /// Set one default header; `None` removes it.
    pub fn set_header(&self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        self.update(|config| match value {
            Some(value) => {
                config.headers.insert(name, value);
            }
            None => {
                config.headers.remove(&name);
            }
        });
    }

    pub fn set_request_logger<F>(&self, log: F)
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        self.update(|config| config.request_log = Some(Arc::new(log)));
    }

    pub fn set_response_logger<F>(&self, log: F)
    where
        F: Fn(&Outcome) + Send + Sync + 'static,
    {
        self.update(|config| config.response_log = Some(Arc::new(log)));
    }

    pub fn clear_loggers(&self) {
        self.update(|config| {
            config.request_log = None;
            config.response_log = None;
        });
    }

    pub fn set_console_logging(&self, enabled: bool) {
        self.update(|config| config.console_logging = enabled);
    }

    /// Start describing a call to `url`. The url is used verbatim.
    pub fn request(&self, url: impl Into<String>) -> Request {
        Request::new(self.clone(), url.into())
    }

    /// Issue one call and resolve to its parsed body.
    pub async fn execute(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        params: Option<Params>,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Option<Value>, ApiError> {
        let mut request = self.request(url).maybe_params(params);
        if let Some(headers) = headers {
            request = request.headers(headers);
        }
        request.send(method).await
    }

    /// Issue one call and decode a single entity from the body.
    pub async fn execute_object<T>(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        params: Option<Params>,
        key: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: FromJson + Send + 'static,
    {
        self.request(url)
            .maybe_params(params)
            .send_for_object(method, key)
            .await
    }

    /// Issue one call and decode a list of entities from the body.
    pub async fn execute_collection<T>(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        params: Option<Params>,
        key: Option<&str>,
    ) -> Result<Vec<T>, ApiError>
    where
        T: FromJson + Send + 'static,
    {
        self.request(url)
            .maybe_params(params)
            .send_for_collection(method, key)
            .await
    }

    /// Issue one call and only report whether it succeeded.
    pub async fn execute_okay(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        params: Option<Params>,
    ) -> Result<Okay, ApiError> {
        self.request(url)
            .maybe_params(params)
            .send_for_okay(method)
            .await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::transport::TransportError;
    use async_trait::async_trait;

    struct NoNetwork;

    #[async_trait]
    impl Transport for NoNetwork {
        async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::new("offline"))
        }
    }

    fn client() -> Client {
        Client::with_transport(Config::new("https://api.example.com/"), NoNetwork)
    }

    #[test]
    fn url_concatenates_base_and_path() {
        assert_eq!(client().url("items"), "https://api.example.com/items");
    }

    #[test]
    #[should_panic(expected = "base URL must be configured")]
    fn empty_base_url_panics() {
        let client = Client::with_transport(Config::default(), NoNetwork);
        let _ = client.url("items");
    }

    #[test]
    fn reconfiguration_is_visible_to_clones() {
        let client = client();
        let clone = client.clone();
        client.set_base_url("https://other.example.com/");
        assert_eq!(clone.base_url(), "https://other.example.com/");
    }

    #[test]
    fn earlier_snapshot_is_unchanged() {
        let client = client();
        let before = client.config();
        client.set_header("Authorization", Some("token".to_string()));
        assert!(before.headers.is_empty());
        assert_eq!(
            client.config().headers.get("Authorization").map(String::as_str),
            Some("token")
        );
    }

    #[test]
    fn set_header_none_removes() {
        let client = client();
        client.merge_headers(BTreeMap::from([
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
        ]));
        client.set_header("A", None);
        let headers = client.config().headers.clone();
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("B"));
    }

    #[test]
    fn configure_replaces_everything() {
        let client = client();
        client.set_console_logging(true);
        client.configure(Config::new("https://new.example.com/").with_header("X", "y"));
        let config = client.config();
        assert!(!config.console_logging);
        assert_eq!(config.base_url, "https://new.example.com/");
    }
}
