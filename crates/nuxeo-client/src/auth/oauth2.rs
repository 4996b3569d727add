//! OAuth2 authentication against the Server's own authorization endpoints.
//!
//! Three token sources are supported: a static JWT, the client-credentials
//! grant, and the authorization-code grant. In authorization-code mode the
//! authenticator stays unarmed (no headers) until [`OAuth2Authenticator::exchange`]
//! succeeds; afterwards expired tokens are refreshed silently.
//!
//! The token state sits behind a single async mutex, so at most one grant
//! or refresh is in flight per authenticator and every caller observes a
//! consistent token.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{bearer_headers, Authenticator};
use crate::error::{ClientError, Result, BODY_SNIPPET_LEN};

const AUTHORIZE_PATH: &str = "oauth2/authorize";
const TOKEN_PATH: &str = "oauth2/token";

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 30;

/// Where access tokens come from
#[derive(Clone)]
pub enum OAuth2Mode {
    /// A pre-issued token used as-is
    Jwt(String),
    /// The client-credentials grant, performed on first use and on expiry
    ClientCredentials,
    /// The authorization-code grant; armed by [`OAuth2Authenticator::exchange`]
    AuthorizationCode,
}

impl fmt::Debug for OAuth2Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(_) => f.write_str("Jwt(..)"),
            Self::ClientCredentials => f.write_str("ClientCredentials"),
            Self::AuthorizationCode => f.write_str("AuthorizationCode"),
        }
    }
}

/// OAuth2 client registration
#[derive(Clone)]
pub struct OAuth2Config {
    /// Server base URL, e.g. `http://localhost:8080/nuxeo`
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid OAuth2 base URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(path)
            .map_err(|e| ClientError::Config(format!("invalid OAuth2 endpoint: {}", e)))
    }
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// An access token with its refresh material
#[derive(Clone)]
pub struct OAuth2Token {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuth2Token {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|at| now + Duration::seconds(REFRESH_MARGIN_SECS) >= at)
            .unwrap_or(false)
    }
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> OAuth2Token {
        OAuth2Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }
}

/// Authenticator backed by an OAuth2 token source
pub struct OAuth2Authenticator {
    config: OAuth2Config,
    mode: OAuth2Mode,
    http: reqwest::Client,
    token: Mutex<Option<OAuth2Token>>,
}

impl OAuth2Authenticator {
    pub fn new(config: OAuth2Config, mode: OAuth2Mode) -> Result<Self> {
        config.endpoint(TOKEN_PATH)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            config,
            mode,
            http,
            token: Mutex::new(None),
        })
    }

    /// Static JWT, no grant involved
    pub fn jwt(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::new(OAuth2Config::new(base_url, ""), OAuth2Mode::Jwt(token.into()))
    }

    pub fn client_credentials(config: OAuth2Config) -> Result<Self> {
        Self::new(config, OAuth2Mode::ClientCredentials)
    }

    pub fn authorization_code(config: OAuth2Config) -> Result<Self> {
        Self::new(config, OAuth2Mode::AuthorizationCode)
    }

    pub fn mode(&self) -> &OAuth2Mode {
        &self.mode
    }

    /// URL the user agent visits to obtain an authorization code.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<Url> {
        let mut url = self.config.endpoint(AUTHORIZE_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id);
            if let Some(redirect_uri) = &self.config.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        Ok(url)
    }

    /// Exchange an authorization code for tokens. On failure the
    /// authenticator stays as it was.
    #[instrument(skip(self, code))]
    pub async fn exchange(&self, code: &str) -> Result<()> {
        if !matches!(self.mode, OAuth2Mode::AuthorizationCode) {
            return Err(ClientError::Usage(
                "code exchange requires authorization-code mode".to_string(),
            ));
        }

        let mut guard = self.token.lock().await;
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            form.push(("redirect_uri", redirect_uri.clone()));
        }
        let token = self.request_token(form, None).await?;
        *guard = Some(token);
        info!("OAuth2 authorization code exchanged");
        Ok(())
    }

    /// True once a token is held (always true for a static JWT)
    pub async fn is_armed(&self) -> bool {
        match self.mode {
            OAuth2Mode::Jwt(_) => true,
            _ => self.token.lock().await.is_some(),
        }
    }

    /// Current token, acquiring or refreshing it as needed.
    pub async fn token(&self) -> Result<Option<OAuth2Token>> {
        if let OAuth2Mode::Jwt(token) = &self.mode {
            return Ok(Some(OAuth2Token {
                access_token: token.clone(),
                token_type: "bearer".to_string(),
                refresh_token: None,
                expires_at: None,
            }));
        }

        let mut guard = self.token.lock().await;
        let now = Utc::now();
        match (&self.mode, guard.as_ref()) {
            (_, Some(token)) if !token.is_expired(now) => {}
            (OAuth2Mode::ClientCredentials, current) => {
                let refresh = current.and_then(|t| t.refresh_token.clone());
                let refreshed = match refresh {
                    Some(refresh) => match self.refresh(refresh).await {
                        Ok(token) => Some(token),
                        Err(err) => {
                            warn!(error = %err, "refresh rejected, requesting a new grant");
                            None
                        }
                    },
                    None => None,
                };
                let token = match refreshed {
                    Some(token) => token,
                    None => self.client_credentials_grant().await?,
                };
                *guard = Some(token);
            }
            (OAuth2Mode::AuthorizationCode, Some(token)) => {
                let refresh = token.refresh_token.clone().ok_or_else(|| {
                    ClientError::Auth("access token expired and no refresh token".to_string())
                })?;
                *guard = Some(self.refresh(refresh).await?);
            }
            (OAuth2Mode::AuthorizationCode, None) => return Ok(None),
            (OAuth2Mode::Jwt(_), _) => {}
        }
        Ok(guard.clone())
    }

    async fn client_credentials_grant(&self) -> Result<OAuth2Token> {
        let mut form = vec![("grant_type", "client_credentials".to_string())];
        if !self.config.scopes.is_empty() {
            form.push(("scope", self.config.scopes.join(" ")));
        }
        let token = self.request_token(form, None).await?;
        info!("OAuth2 client-credentials token acquired");
        Ok(token)
    }

    async fn refresh(&self, refresh_token: String) -> Result<OAuth2Token> {
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
        ];
        let token = self.request_token(form, Some(refresh_token)).await?;
        info!("OAuth2 access token refreshed");
        Ok(token)
    }

    async fn request_token(
        &self,
        mut form: Vec<(&'static str, String)>,
        previous_refresh: Option<String>,
    ) -> Result<OAuth2Token> {
        form.push(("client_id", self.config.client_id.clone()));
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let url = self.config.endpoint(TOKEN_PATH)?;
        debug!(%url, "requesting OAuth2 token");
        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Auth(format!("token response unreadable: {}", e)))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let excerpt: String = text.chars().take(BODY_SNIPPET_LEN).collect();
            return Err(ClientError::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                excerpt
            )));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ClientError::Auth(format!("invalid token response: {}", e)))?;
        Ok(parsed.into_token(previous_refresh))
    }
}

impl fmt::Debug for OAuth2Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Authenticator")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for OAuth2Authenticator {
    async fn headers(&self, _request: &reqwest::Request) -> Result<HeaderMap> {
        match self.token().await? {
            Some(token) => bearer_headers(&token.access_token),
            None => Ok(HeaderMap::new()),
        }
    }

    async fn invalidate(&self) -> bool {
        let mut guard = self.token.lock().await;
        match (&self.mode, guard.as_mut()) {
            (OAuth2Mode::ClientCredentials, Some(_)) => {
                *guard = None;
                true
            }
            (OAuth2Mode::AuthorizationCode, Some(token)) if token.refresh_token.is_some() => {
                token.expires_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }
}
