//! Client configuration: base URL, default headers, and logging hooks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::http::{HttpRequest, Outcome};

/// Called with every request just before it is handed to the transport.
pub type RequestLog = Arc<dyn Fn(&HttpRequest) + Send + Sync>;

/// Called with every finished call before its result resolves.
pub type ResponseLog = Arc<dyn Fn(&Outcome) + Send + Sync>;

pub const BASE_URL_ENV: &str = "CRUDE_BASE_URL";
pub const CONSOLE_LOG_ENV: &str = "CRUDE_CONSOLE_LOG";

#[derive(Clone, Default)]
pub struct Config {
    /// Prefix for every conventional resource path. Must be set before the
    /// first request that relies on it.
    pub base_url: String,
    /// Sent with every request unless overridden per call.
    pub headers: BTreeMap<String, String>,
    pub request_log: Option<RequestLog>,
    pub response_log: Option<ResponseLog>,
    /// Emit each outcome through `tracing` when no `response_log` is set.
    pub console_logging: bool,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build from `CRUDE_BASE_URL` and `CRUDE_CONSOLE_LOG`.
    ///
    /// Returns `None` when the base URL variable is unset or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup(BASE_URL_ENV).filter(|url| !url.is_empty())?;
        let console_logging = lookup(CONSOLE_LOG_ENV)
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Some(Self::new(base_url).with_console_logging(console_logging))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_request_logger<F>(mut self, log: F) -> Self
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        self.request_log = Some(Arc::new(log));
        self
    }

    pub fn with_response_logger<F>(mut self, log: F) -> Self
    where
        F: Fn(&Outcome) + Send + Sync + 'static,
    {
        self.response_log = Some(Arc::new(log));
        self
    }

    pub fn with_console_logging(mut self, enabled: bool) -> Self {
        self.console_logging = enabled;
        self
    }

    /// Default headers with `overrides` applied on top, sorted by name.
    pub(crate) fn merged_headers(
        &self,
        overrides: Option<&BTreeMap<String, String>>,
    ) -> Vec<(String, String)> {
        let mut merged = self.headers.clone();
        if let Some(overrides) = overrides {
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged.into_iter().collect()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("request_log", &self.request_log.is_some())
            .field("response_log", &self.response_log.is_some())
            .field("console_logging", &self.console_logging)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_call_headers_win_on_collision() {
        let config = Config::new("https://api.example.com/")
            .with_header("Accept", "application/json")
            .with_header("X-Device-Id", "default");
        let overrides = BTreeMap::from([("X-Device-Id".to_string(), "override".to_string())]);

        let merged = config.merged_headers(Some(&overrides));
        assert_eq!(
            merged,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Device-Id".to_string(), "override".to_string()),
            ]
        );
    }

    #[test]
    fn with_headers_extends_existing() {
        let config = Config::new("u")
            .with_header("A", "1")
            .with_headers([("B", "2"), ("A", "3")]);
        assert_eq!(config.headers.get("A").map(String::as_str), Some("3"));
        assert_eq!(config.headers.len(), 2);
    }

    #[test]
    fn debug_hides_callbacks() {
        let config = Config::new("u").with_request_logger(|_| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("request_log: true"));
        assert!(rendered.contains("response_log: false"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn from_lookup_requires_base_url() {
        assert!(Config::from_lookup(lookup(&[])).is_none());
        assert!(Config::from_lookup(lookup(&[(BASE_URL_ENV, "")])).is_none());
        assert!(Config::from_lookup(lookup(&[(CONSOLE_LOG_ENV, "1")])).is_none());
    }

    #[test]
    fn from_lookup_reads_base_url_and_console_flag() {
        let config = Config::from_lookup(lookup(&[
            (BASE_URL_ENV, "https://api.example.com/"),
            (CONSOLE_LOG_ENV, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.com/");
        assert!(config.console_logging);

        let config =
            Config::from_lookup(lookup(&[(BASE_URL_ENV, "u"), (CONSOLE_LOG_ENV, "0")])).unwrap();
        assert!(!config.console_logging);
    }
}
