//! Client configuration.

use crate::error::{ClientError, ClientResult};
use braintrust_streaming::StreamConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default Braintrust API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.braintrust.dev";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "BRAINTRUST_API_KEY";
/// Environment variable overriding the API endpoint.
pub const API_URL_ENV: &str = "BRAINTRUST_API_URL";
/// Environment variable naming the organization.
pub const ORG_NAME_ENV: &str = "BRAINTRUST_ORG_NAME";

/// Configuration for a [`BraintrustClient`](crate::BraintrustClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key for authentication.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL for the API. Defaults to [`DEFAULT_API_URL`].
    pub api_url: Option<Url>,
    /// Organization name, sent as `x-bt-org-name`.
    pub org_name: Option<String>,
    /// Request timeout in seconds. Zero disables the timeout.
    pub timeout_seconds: u64,
    /// How streamed responses are decoded.
    pub stream: StreamConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            org_name: None,
            timeout_seconds: 300,
            stream: StreamConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config with an API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Read the configuration from `BRAINTRUST_API_KEY`,
    /// `BRAINTRUST_API_URL` and `BRAINTRUST_ORG_NAME`.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ClientError::configuration(format!("{API_KEY_ENV} not set")))?;

        let mut config = Self::with_api_key(api_key);
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.is_empty()) {
            let url = Url::parse(&url).map_err(|e| {
                ClientError::configuration(format!("{API_URL_ENV} is not a valid URL: {e}"))
            })?;
            config = config.api_url(url);
        }
        if let Some(org) = lookup(ORG_NAME_ENV).filter(|org| !org.is_empty()) {
            config = config.org_name(org);
        }
        Ok(config)
    }

    /// Set the API URL.
    #[must_use]
    pub fn api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    /// Set the organization name.
    #[must_use]
    pub fn org_name(mut self, org: impl Into<String>) -> Self {
        self.org_name = Some(org.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs();
        self
    }

    /// Set the stream configuration.
    #[must_use]
    pub fn stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// The request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    /// Absolute URL for an API path such as `function/invoke`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self
            .api_url
            .as_ref()
            .map_or(DEFAULT_API_URL, |url| url.as_str());
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_requires_key() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(ref msg) if msg.contains(API_KEY_ENV)));

        let err = ClientConfig::from_lookup(lookup(&[(API_KEY_ENV, "")])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[(API_KEY_ENV, "sk-test")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.org_name, None);
        assert_eq!(
            config.endpoint("function/invoke"),
            "https://api.braintrust.dev/function/invoke"
        );
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "sk-test"),
            (API_URL_ENV, "http://localhost:8000/v1/"),
            (ORG_NAME_ENV, "acme"),
        ]))
        .unwrap();

        assert_eq!(config.org_name.as_deref(), Some("acme"));
        assert_eq!(
            config.endpoint("/function/invoke"),
            "http://localhost:8000/v1/function/invoke"
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_url() {
        let err = ClientConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "sk-test"),
            (API_URL_ENV, "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(ref msg) if msg.contains(API_URL_ENV)));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = ClientConfig::with_api_key("sk-secret").org_name("acme");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("acme"));
    }

    #[test]
    fn test_timeout() {
        let config = ClientConfig::default().timeout(Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        let config = config.timeout(Duration::ZERO);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"org_name": "acme", "stream": {"stop_at_done": false}}"#)
                .unwrap();
        assert_eq!(config.timeout_seconds, 300);
        assert!(!config.stream.stop_at_done);
    }
}
