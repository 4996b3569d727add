//! The request pipeline: one call from assembly to decoded result.
//!
//! Headers are assembled in a fixed order: `Accept`, request options
//! (client defaults, then per-call), call-specific headers, authenticator
//! headers (their `Authorization` wins), and finally `Content-Type` for the
//! body. A 401 answer triggers one retry when the authenticator can refresh
//! its credentials and the body can be replayed.

use bytes::Bytes;
use nuxeo_core::Entity;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use crate::blob::{Blob, OCTET_STREAM};
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;

pub const JSON: &str = "application/json";

/// Request body shapes
pub(crate) enum RequestBody {
    Empty,
    /// Replayable in-memory payload
    Bytes { content_type: String, data: Bytes },
    /// Streamed payload, sent once
    Stream {
        content_type: String,
        body: Option<reqwest::Body>,
    },
}

impl RequestBody {
    fn content_type(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Bytes { content_type, .. } | Self::Stream { content_type, .. } => {
                Some(content_type)
            }
        }
    }

    fn is_replayable(&self) -> bool {
        !matches!(self, Self::Stream { .. })
    }

    fn next_body(&mut self) -> Result<Option<reqwest::Body>> {
        match self {
            Self::Empty => Ok(None),
            Self::Bytes { data, .. } => Ok(Some(reqwest::Body::from(data.clone()))),
            Self::Stream { body, .. } => body
                .take()
                .map(Some)
                .ok_or_else(|| ClientError::Usage("request body already sent".to_string())),
        }
    }
}

/// One call against the REST API, built fluently and sent once.
///
/// ```no_run
/// # async fn example(client: nuxeo_client::NuxeoClient) -> nuxeo_client::Result<()> {
/// use nuxeo_client::{Method, RequestOptions};
///
/// let doc: nuxeo_core::Document = client
///     .request(Method::GET, "repo/default/path/default-domain")
///     .options(RequestOptions::new().schema("dublincore"))
///     .fetch()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a request does nothing until sent"]
pub struct Request {
    client: NuxeoClient,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    accept: Option<String>,
    body: RequestBody,
    options: Option<RequestOptions>,
    cancel: Option<CancellationToken>,
}

impl Request {
    pub(crate) fn new(client: NuxeoClient, method: Method, path: impl Into<String>) -> Self {
        Self {
            client,
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            accept: None,
            body: RequestBody::Empty,
            options: None,
            cancel: None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn query_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value.to_string()),
            None => self,
        }
    }

    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Call-specific header, validated when the request is sent
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn accept(mut self, mime_type: impl Into<String>) -> Self {
        self.accept = Some(mime_type.into());
        self
    }

    /// JSON-encode `body`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let data = serde_json::to_vec(body)
            .map_err(|e| ClientError::Usage(format!("request body is not serializable: {}", e)))?;
        self.body = RequestBody::Bytes {
            content_type: JSON.to_string(),
            data: Bytes::from(data),
        };
        Ok(self)
    }

    pub fn bytes(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        };
        self
    }

    /// Streamed body; such a request is never retried.
    pub fn stream(mut self, content_type: impl Into<String>, body: reqwest::Body) -> Self {
        self.body = RequestBody::Stream {
            content_type: content_type.into(),
            body: Some(body),
        };
        self
    }

    /// Per-call options, layered over the client defaults
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn options_opt(self, options: Option<RequestOptions>) -> Self {
        match options {
            Some(options) => self.options(options),
            None => self,
        }
    }

    /// Abort the call when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn cancel_opt(mut self, token: Option<CancellationToken>) -> Self {
        if token.is_some() {
            self.cancel = token;
        }
        self
    }

    /// Send and decode a JSON answer.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.send_for_body().await?;
        serde_json::from_slice(&body).map_err(|e| {
            ClientError::Decode(format!("unexpected response shape: {}", e))
        })
    }

    /// Like [`fetch`](Self::fetch), `None` when the answer has no body.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let body = self.send_for_body().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ClientError::Decode(format!("unexpected response shape: {}", e)))
    }

    /// Send and decode a polymorphic entity.
    pub async fn fetch_entity(self) -> Result<Entity> {
        let body = self.send_for_body().await?;
        Ok(Entity::from_slice(&body)?)
    }

    /// Send and stream the answer as a blob. The caller owns the stream.
    pub async fn fetch_blob(mut self) -> Result<Blob> {
        if self.accept.is_none() {
            self.accept = Some(OCTET_STREAM.to_string());
        }
        let cancel = self.cancel.clone();
        let response = self.send().await?;
        Ok(Blob::from_response(response, cancel))
    }

    /// Send and discard the answer.
    pub async fn execute(self) -> Result<()> {
        self.send().await.map(drop)
    }

    async fn send_for_body(self) -> Result<Bytes> {
        let cancel = self.cancel.clone();
        let response = self.send().await?;
        read_body(response, cancel.as_ref()).await
    }

    /// Send and return the raw response once its status is a success.
    pub async fn send(self) -> Result<reqwest::Response> {
        let Request {
            client,
            method,
            path,
            query,
            headers: extra,
            accept,
            mut body,
            options,
            cancel,
        } = self;

        let url = resolve_url(&client, &path, &query)?;
        let options = match &options {
            Some(options) => client.config().default_options.merged(options),
            None => client.config().default_options.clone(),
        };

        let mut headers = HeaderMap::new();
        let accept = accept.as_deref().unwrap_or(JSON);
        headers.insert(ACCEPT, header_value(accept)?);
        options.apply(&mut headers)?;
        for (name, value) in &extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::Config(format!("invalid header name: {}", name)))?;
            headers.insert(name, header_value(value)?);
        }
        let content_type = body.content_type().map(header_value).transpose()?;
        let timeout = options
            .effective_http_timeout()
            .unwrap_or(client.config().timeout);

        let auth = client.authenticator();
        let mut retried = false;
        loop {
            let mut builder = client
                .http()
                .request(method.clone(), url.clone())
                .headers(headers.clone())
                .timeout(timeout);
            if let Some(payload) = body.next_body()? {
                builder = builder.body(payload);
            }
            let mut request = builder.build().map_err(ClientError::transport)?;

            let auth_headers = auth.headers(&request).await?;
            for (name, value) in auth_headers.iter() {
                request.headers_mut().insert(name.clone(), value.clone());
            }
            if let Some(content_type) = &content_type {
                request.headers_mut().insert(CONTENT_TYPE, content_type.clone());
            }

            debug!(%method, %url, "dispatching request");
            let response = dispatch(client.http(), request, cancel.as_ref()).await?;
            let status = response.status();
            debug!(%method, %url, status = status.as_u16(), "response received");

            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::UNAUTHORIZED
                && !retried
                && body.is_replayable()
                && auth.invalidate().await
            {
                warn!(%method, %url, "credentials rejected, retrying once with fresh ones");
                retried = true;
                continue;
            }
            let payload = read_body(response, cancel.as_ref()).await?;
            return Err(ClientError::from_response_body(status.as_u16(), &payload));
        }
    }
}

fn resolve_url(client: &NuxeoClient, path: &str, query: &[(String, String)]) -> Result<Url> {
    let mut url = client.url(path)?;
    if !query.is_empty() {
        let encoded = query
            .iter()
            .map(|(name, value)| format!("{}={}", encode_query(name), encode_query(value)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&encoded));
    }
    Ok(url)
}

/// Form-encode one query component, `*` included.
fn encode_query(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::Config(format!("invalid header value: {}", value)))
}

async fn dispatch(
    http: &reqwest::Client,
    request: reqwest::Request,
    cancel: Option<&CancellationToken>,
) -> Result<reqwest::Response> {
    let call = http.execute(request);
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled("request cancelled".to_string())),
            response = call => response.map_err(ClientError::transport),
        },
        None => call.await.map_err(ClientError::transport),
    }
}

pub(crate) async fn read_body(
    response: reqwest::Response,
    cancel: Option<&CancellationToken>,
) -> Result<Bytes> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled("request cancelled".to_string())),
            body = response.bytes() => body.map_err(ClientError::transport),
        },
        None => response.bytes().await.map_err(ClientError::transport),
    }
}

/// Encode a document path segment by segment, keeping the slashes.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Encode one path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
