//! Authenticators decorating each outgoing request.
//!
//! An [`Authenticator`] turns a request into the headers that authenticate
//! it. Implementations must be safe to call concurrently and must not do
//! network I/O, except OAuth2 token acquisition and refresh. Returning an
//! empty map is legal.

mod oauth2;

use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::error::{ClientError, Result};

pub use self::oauth2::{OAuth2Authenticator, OAuth2Config, OAuth2Mode, OAuth2Token};

/// Header carrying a Server-side session token
pub const TOKEN_HEADER: &str = "X-Authentication-Token";

/// Produces the authentication headers for a request.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Headers to merge into `request`; `Authorization` from here wins.
    async fn headers(&self, request: &reqwest::Request) -> Result<HeaderMap>;

    /// Drop any cached credential after the Server rejected it. Returns
    /// true when a retry may succeed with fresh credentials.
    async fn invalidate(&self) -> bool {
        false
    }
}

/// No authentication at all
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    async fn headers(&self, _request: &reqwest::Request) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}

/// HTTP basic authentication
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(user:password)>`, or `None` when a part is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        let credentials = format!("{}:{}", self.username, self.password);
        Some(format!("Basic {}", STANDARD.encode(credentials)))
    }
}

impl fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn headers(&self, _request: &reqwest::Request) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.header_value() {
            headers.insert(AUTHORIZATION, sensitive(&value)?);
        }
        Ok(headers)
    }
}

/// Opaque bearer token
#[derive(Clone)]
pub struct BearerAuthenticator {
    token: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    async fn headers(&self, _request: &reqwest::Request) -> Result<HeaderMap> {
        bearer_headers(&self.token)
    }
}

/// Server-side session token sent in [`TOKEN_HEADER`]
#[derive(Clone)]
pub struct TokenAuthenticator {
    token: String,
}

impl TokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn headers(&self, _request: &reqwest::Request) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if !self.token.is_empty() {
            headers.insert(HeaderName::from_static("x-authentication-token"), sensitive(&self.token)?);
        }
        Ok(headers)
    }
}

pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if !token.is_empty() {
        headers.insert(AUTHORIZATION, sensitive(&format!("Bearer {}", token))?);
    }
    Ok(headers)
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::Auth("credentials contain invalid header characters".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
