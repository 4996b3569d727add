//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, Result};
use crate::options::RequestOptions;

/// Client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://localhost:8080/nuxeo`
    pub base_url: String,
    /// REST API root relative to the base URL
    pub api_path: String,
    /// Repository used by the repository manager
    pub repository: String,
    /// Request timeout, unless options derive another one
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Options applied to every call before the per-call ones
    pub default_options: RequestOptions,
    /// Maximum redirect hops, 0 disables redirects
    pub follow_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_path: "api/v1".to_string(),
            repository: "default".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("nuxeo-client/{}", env!("CARGO_PKG_VERSION")),
            default_options: RequestOptions::default(),
            follow_redirects: 10,
        }
    }
}

impl ClientConfig {
    /// Create a new config with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_follow_redirects(mut self, hops: usize) -> Self {
        self.follow_redirects = hops;
        self
    }

    /// Base URL with a trailing slash
    pub fn base(&self) -> Result<Url> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base URL is required".to_string()));
        }
        let mut url = Url::parse(self.base_url.trim())
            .map_err(|e| ClientError::Config(format!("invalid base URL: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base URL cannot be a base: {}",
                self.base_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// REST API root with a trailing slash
    pub fn api_base(&self) -> Result<Url> {
        let api_path = self.api_path.trim_matches('/');
        if api_path.is_empty() {
            return self.base();
        }
        self.base()?
            .join(&format!("{}/", api_path))
            .map_err(|e| ClientError::Config(format!("invalid API path: {}", e)))
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_path, "api/v1");
        assert_eq!(config.repository, "default");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("nuxeo-client/"));
        assert_eq!(config.follow_redirects, 10);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = ClientConfig::new("http://localhost:8080/nuxeo");
        assert_eq!(config.base().unwrap().as_str(), "http://localhost:8080/nuxeo/");
        assert_eq!(
            config.api_base().unwrap().as_str(),
            "http://localhost:8080/nuxeo/api/v1/"
        );

        let trailing = ClientConfig::new("http://localhost:8080/nuxeo/");
        assert_eq!(trailing.api_base().unwrap(), config.api_base().unwrap());
    }

    #[test]
    fn test_missing_base_url() {
        assert!(matches!(
            ClientConfig::default().base(),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("not a url").base(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://x/nuxeo","timeout":5}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.repository, "default");
    }
}
