//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Method;
use url::Url;

use crate::api::{
    CapabilitiesApi, ConfigurationApi, DirectoriesApi, RepositoryApi, UsersApi, WorkflowsApi,
};
use crate::auth::{Authenticator, BasicAuthenticator, BearerAuthenticator, NoAuth};
use crate::automation::AutomationApi;
use crate::batch::BatchUploadApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::Request;

/// Nuxeo client.
///
/// Cheap to clone; clones share the connection pool and the
/// authenticator.
///
/// # Example
///
/// ```no_run
/// use nuxeo_client::NuxeoClient;
///
/// # async fn example() -> nuxeo_client::Result<()> {
/// let client = NuxeoClient::builder()
///     .base_url("http://localhost:8080/nuxeo")
///     .basic_auth("Administrator", "Administrator")
///     .build()?;
///
/// let root = client.repository().fetch_root().await?;
/// println!("{}", root.uid);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NuxeoClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_url: Url,
    config: ClientConfig,
    auth: Arc<dyn Authenticator>,
}

impl NuxeoClient {
    /// Create a client from a configuration and an authenticator
    pub fn new(config: ClientConfig, auth: Arc<dyn Authenticator>) -> Result<Self> {
        let base_url = config.base()?;
        let api_url = config.api_base()?;

        let redirects = match config.follow_redirects {
            0 => Policy::none(),
            hops => Policy::limited(hops),
        };
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirects)
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                api_url,
                config,
                auth,
            }),
        })
    }

    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Server base URL, with a trailing slash
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// REST API root, with a trailing slash
    pub fn api_url(&self) -> &Url {
        &self.inner.api_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.inner.auth
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    // ==================== API accessors ====================

    /// Documents of the configured repository
    pub fn repository(&self) -> RepositoryApi {
        RepositoryApi::new(self.clone(), self.inner.config.repository.clone())
    }

    /// Documents of another repository
    pub fn repository_named(&self, name: impl Into<String>) -> RepositoryApi {
        RepositoryApi::new(self.clone(), name.into())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    pub fn workflows(&self) -> WorkflowsApi {
        WorkflowsApi::new(self.clone())
    }

    pub fn directories(&self) -> DirectoriesApi {
        DirectoriesApi::new(self.clone())
    }

    pub fn configuration(&self) -> ConfigurationApi {
        ConfigurationApi::new(self.clone())
    }

    pub fn capabilities(&self) -> CapabilitiesApi {
        CapabilitiesApi::new(self.clone())
    }

    pub fn automation(&self) -> AutomationApi {
        AutomationApi::new(self.clone())
    }

    pub fn batch_upload(&self) -> BatchUploadApi {
        BatchUploadApi::new(self.clone())
    }

    /// Arbitrary call relative to the REST API root
    pub fn request(&self, method: Method, path: impl Into<String>) -> Request {
        Request::new(self.clone(), method, path)
    }

    /// URL of an API path. Paths are always relative to the API root.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .api_url
            .join(&format!("./{}", path))
            .map_err(|e| ClientError::Usage(format!("invalid path '{}': {}", path, e)))
    }
}

impl std::fmt::Debug for NuxeoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NuxeoClient")
            .field("api_url", &self.inner.api_url.as_str())
            .field("auth", &self.inner.auth)
            .finish()
    }
}

/// Builder for creating a [`NuxeoClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    auth: Option<Arc<dyn Authenticator>>,
}

impl ClientBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            auth: None,
        }
    }

    /// Start from a full configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the Server base URL, e.g. `http://localhost:8080/nuxeo`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.config.api_path = path.into();
        self
    }

    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.config.repository = name.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set a custom user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn default_options(mut self, options: RequestOptions) -> Self {
        self.config.default_options = options;
        self
    }

    pub fn follow_redirects(mut self, hops: usize) -> Self {
        self.config.follow_redirects = hops;
        self
    }

    pub fn authenticator(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Share one authenticator between clients
    pub fn shared_authenticator(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.authenticator(BasicAuthenticator::new(username, password))
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.authenticator(BearerAuthenticator::new(token))
    }

    /// Build the client
    pub fn build(self) -> Result<NuxeoClient> {
        let auth = self.auth.unwrap_or_else(|| Arc::new(NoAuth));
        NuxeoClient::new(self.config, auth)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = NuxeoClient::builder().build().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_url_join() {
        let client = NuxeoClient::builder()
            .base_url("http://localhost:8080/nuxeo")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/nuxeo/");
        assert_eq!(
            client.url("capabilities").unwrap().as_str(),
            "http://localhost:8080/nuxeo/api/v1/capabilities"
        );
        assert_eq!(
            client.url("/repo/default/id/abc/@blob/file:content").unwrap().as_str(),
            "http://localhost:8080/nuxeo/api/v1/repo/default/id/abc/@blob/file:content"
        );
    }

    #[test]
    fn test_repository_accessor_uses_config() {
        let client = NuxeoClient::builder()
            .base_url("http://localhost:8080/nuxeo")
            .repository("archive")
            .build()
            .unwrap();
        assert_eq!(client.repository().name(), "archive");
        assert_eq!(client.repository_named("other").name(), "other");
    }
}
