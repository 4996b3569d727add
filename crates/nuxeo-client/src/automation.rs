//! Automation: operation builder, request encoding and the polymorphic
//! response.
//!
//! Operations without blob inputs are sent as one JSON payload
//! `{input?, params, context}`. With blob inputs the payload becomes the
//! first part of a `multipart/related` body and every blob follows as its
//! own `input` part, streamed in declaration order.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use futures::{stream, StreamExt, TryStreamExt};
use nuxeo_core::{Document, Documents, Entity, Iso8601Time};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::blob::{
    declared_length, disposition_for, mime_type_of, response_stream, Blob, ByteStream,
};
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::{encode_segment, read_body, JSON};

pub const VOID_OPERATION_HEADER: &str = "X-NXVoidOperation";

const ACCEPT_ANY: &str = "application/json, */*";

/// A parameter value, stringified by type when sent
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(Iso8601Time),
    /// Any other value, already in its display form
    Other(String),
}

impl ParamValue {
    /// Generic display form for values without a dedicated variant
    pub fn display(value: impl fmt::Display) -> Self {
        Self::Other(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Other(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Time(t) => write!(f, "{}", t),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Iso8601Time> for ParamValue {
    fn from(value: Iso8601Time) -> Self {
        Self::Time(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for ParamValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Time(value.into())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Other(values.join(","))
    }
}

/// What an operation runs on
#[derive(Debug, Default)]
pub enum OperationInput {
    #[default]
    None,
    /// Document ids or paths, in caller order
    Docs(Vec<String>),
    Blobs(Vec<Blob>),
}

impl OperationInput {
    /// `doc:<ref>` for one document, `docs:<a>,<b>` for several
    pub fn spec(&self) -> Option<String> {
        match self {
            Self::Docs(ids) if ids.len() == 1 => Some(format!("doc:{}", ids[0])),
            Self::Docs(ids) if !ids.is_empty() => Some(format!("docs:{}", ids.join(","))),
            _ => None,
        }
    }
}

/// An automation call.
///
/// ```
/// use nuxeo_client::Operation;
///
/// let op = Operation::new("Document.SetProperty")
///     .input_doc("/default-domain/workspaces/ws")
///     .param("xpath", "dc:title")
///     .param("value", "Renamed");
/// assert_eq!(op.id(), "Document.SetProperty");
/// ```
#[derive(Debug)]
pub struct Operation {
    id: String,
    input: OperationInput,
    params: BTreeMap<String, ParamValue>,
    context: BTreeMap<String, ParamValue>,
    void: bool,
    options: Option<RequestOptions>,
    cancel: Option<CancellationToken>,
}

impl Operation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: OperationInput::None,
            params: BTreeMap::new(),
            context: BTreeMap::new(),
            void: false,
            options: None,
            cancel: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input(mut self, input: OperationInput) -> Self {
        self.input = input;
        self
    }

    /// Add a document input; replaces blob inputs.
    pub fn input_doc(mut self, id_or_path: impl Into<String>) -> Self {
        match &mut self.input {
            OperationInput::Docs(ids) => ids.push(id_or_path.into()),
            _ => self.input = OperationInput::Docs(vec![id_or_path.into()]),
        }
        self
    }

    pub fn input_docs<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter().fold(self, |op, id| op.input_doc(id))
    }

    /// Add a blob input; replaces document inputs.
    pub fn input_blob(mut self, blob: Blob) -> Self {
        match &mut self.input {
            OperationInput::Blobs(blobs) => blobs.push(blob),
            _ => self.input = OperationInput::Blobs(vec![blob]),
        }
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn context(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.context.insert(name.into(), value.into());
        self
    }

    /// The Server need not send the operation result back.
    pub fn void(mut self, void: bool) -> Self {
        self.void = void;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn input_spec(&self) -> Option<String> {
        self.input.spec()
    }

    fn payload(&self, with_input: bool) -> OperationPayload {
        OperationPayload {
            input: if with_input { self.input_spec() } else { None },
            params: stringify(&self.params),
            context: stringify(&self.context),
        }
    }
}

fn stringify(values: &BTreeMap<String, ParamValue>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

/// JSON body of an automation call
#[derive(Debug, Serialize)]
struct OperationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<String>,
    params: BTreeMap<String, String>,
    context: BTreeMap<String, String>,
}

/// A `multipart/related` body: the JSON payload, then one part per blob.
fn multipart_body(payload: &OperationPayload, blobs: &mut [Blob]) -> Result<(String, ByteStream)> {
    let boundary = format!("nuxeo-{}", uuid::Uuid::new_v4().simple());
    let json = serde_json::to_vec(payload)
        .map_err(|e| ClientError::Usage(format!("operation payload is not serializable: {}", e)))?;

    let mut parts: Vec<ByteStream> = Vec::with_capacity(blobs.len() * 2 + 2);
    let head = format!(
        "--{}\r\nContent-Type: {}\r\nContent-Disposition: form-data; name=\"request\"\r\n\r\n",
        boundary, JSON
    );
    let mut first = Vec::with_capacity(head.len() + json.len());
    first.extend_from_slice(head.as_bytes());
    first.extend_from_slice(&json);
    parts.push(once(Bytes::from(first)));

    for blob in blobs.iter_mut() {
        let head = format!(
            "\r\n--{}\r\nContent-Type: {}\r\nContent-Disposition: {}\r\nContent-Transfer-Encoding: binary\r\n\r\n",
            boundary,
            blob.mime_type(),
            disposition_for("input", blob.filename()),
        );
        parts.push(once(Bytes::from(head)));
        parts.push(blob.take_stream()?);
    }
    parts.push(once(Bytes::from(format!("\r\n--{}--\r\n", boundary))));

    let content_type = format!(
        "multipart/related; boundary=\"{}\"; type=\"{}\"; start=\"request\"",
        boundary, JSON
    );
    Ok((content_type, Box::pin(stream::iter(parts).flatten())))
}

fn once(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Automation API
pub struct AutomationApi {
    client: NuxeoClient,
}

impl AutomationApi {
    pub(crate) fn new(client: NuxeoClient) -> Self {
        Self { client }
    }

    /// Run an operation: `POST automation/<id>`.
    #[instrument(skip(self, operation), fields(operation = %operation.id))]
    pub async fn execute(&self, operation: Operation) -> Result<OperationResponse> {
        let path = format!("automation/{}", encode_segment(&operation.id));
        run(&self.client, path, operation, true).await
    }

    /// The operation registry as published by the Server
    #[instrument(skip(self))]
    pub async fn registry(&self) -> Result<nuxeo_core::Field> {
        self.client
            .request(Method::GET, "automation")
            .fetch()
            .await
    }
}

/// Send `operation` to `path`. Batch execution passes `with_input = false`
/// since the batch is the input.
pub(crate) async fn run(
    client: &NuxeoClient,
    path: String,
    mut operation: Operation,
    with_input: bool,
) -> Result<OperationResponse> {
    let payload = operation.payload(with_input);
    let mut request = client
        .request(Method::POST, path)
        .accept(ACCEPT_ANY)
        .options_opt(operation.options.take())
        .cancel_opt(operation.cancel.clone());
    if operation.void {
        request = request.header(VOID_OPERATION_HEADER, "true");
    }

    request = match &mut operation.input {
        OperationInput::Blobs(blobs) if with_input && !blobs.is_empty() => {
            let (content_type, body) = multipart_body(&payload, blobs)?;
            debug!(blobs = blobs.len(), "sending operation as multipart");
            request.stream(content_type, reqwest::Body::wrap_stream(body))
        }
        _ => request.json(&payload)?,
    };

    let response = request.send().await?;
    OperationResponse::from_response(response, operation.cancel).await
}

enum Payload {
    Empty,
    Json(Bytes),
    Blob(Blob),
    Blobs(BlobList),
}

/// Result of an automation call.
///
/// Typed accessors check the payload shape and fail with a decode error
/// on mismatch.
pub struct OperationResponse {
    payload: Payload,
}

impl OperationResponse {
    pub(crate) async fn from_response(
        response: reqwest::Response,
        cancel: Option<CancellationToken>,
    ) -> Result<Self> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Self {
                payload: Payload::Empty,
            });
        }
        let headers = response.headers();
        let mime_type = mime_type_of(headers);
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let payload = if essence.starts_with("multipart/") {
            let boundary = boundary_of(headers)?;
            Payload::Blobs(BlobList::new(response, boundary, cancel))
        } else if essence == JSON || essence.ends_with("+json") {
            let body = read_body(response, cancel.as_ref()).await?;
            if body.is_empty() {
                Payload::Empty
            } else {
                Payload::Json(body)
            }
        } else if declared_length(headers) == 0 {
            Payload::Empty
        } else {
            Payload::Blob(Blob::from_response(response, cancel))
        };
        Ok(Self { payload })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }

    /// Raw JSON answer, if any
    pub fn json(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Json(body) => Some(body),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self.payload {
            Payload::Empty => "an empty answer",
            Payload::Json(_) => "a JSON entity",
            Payload::Blob(_) => "a blob",
            Payload::Blobs(_) => "a list of blobs",
        }
    }

    fn json_or_err(&self, expected: &str) -> Result<&[u8]> {
        self.json().ok_or_else(|| {
            ClientError::Decode(format!("expected {}, got {}", expected, self.kind()))
        })
    }

    /// The answer as a polymorphic entity
    pub fn entity(&self) -> Result<Entity> {
        Ok(Entity::from_slice(self.json_or_err("an entity")?)?)
    }

    pub fn as_document(&self) -> Result<Document> {
        match self.entity()? {
            Entity::Document(doc) => Ok(*doc),
            other => Err(ClientError::Decode(format!(
                "expected a document, got entity-type '{}'",
                other.entity_type()
            ))),
        }
    }

    pub fn as_documents(&self) -> Result<Documents> {
        match self.entity()? {
            Entity::Documents(docs) => Ok(docs),
            other => Err(ClientError::Decode(format!(
                "expected documents, got entity-type '{}'",
                other.entity_type()
            ))),
        }
    }

    /// The answer decoded into any JSON shape
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.json_or_err("JSON")?;
        serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// The single streamed blob
    pub fn as_blob(self) -> Result<Blob> {
        match self.payload {
            Payload::Blob(blob) => Ok(blob),
            _ => Err(ClientError::Decode(format!(
                "expected a blob, got {}",
                self.kind()
            ))),
        }
    }

    /// The multipart blobs, parsed lazily
    pub fn as_blobs(self) -> Result<BlobList> {
        match self.payload {
            Payload::Blobs(list) => Ok(list),
            _ => Err(ClientError::Decode(format!(
                "expected a list of blobs, got {}",
                self.kind()
            ))),
        }
    }
}

impl fmt::Debug for OperationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationResponse")
            .field("payload", &self.kind())
            .finish()
    }
}

fn boundary_of(headers: &HeaderMap) -> Result<String> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime: mime_guess::mime::Mime = content_type
        .parse()
        .map_err(|e| ClientError::Decode(format!("invalid multipart content type: {}", e)))?;
    mime.get_param(mime_guess::mime::BOUNDARY)
        .map(|b| b.as_str().to_string())
        .ok_or_else(|| ClientError::Decode("multipart answer without boundary".to_string()))
}

/// Lazy sequence of blobs read from a multipart answer.
///
/// Each blob streams straight from the connection, so it must be consumed
/// or dropped before the next one is requested.
pub struct BlobList {
    multipart: multer::Multipart<'static>,
}

impl BlobList {
    fn new(
        response: reqwest::Response,
        boundary: String,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Self {
            multipart: multer::Multipart::new(response_stream(response, cancel), boundary),
        }
    }

    /// Next blob, or `None` once the answer is exhausted
    pub async fn next_blob(&mut self) -> Result<Option<Blob>> {
        let Some(field) = self.multipart.next_field().await.map_err(multipart_error)? else {
            return Ok(None);
        };
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = mime_type_of(field.headers());
        let length = declared_length(field.headers());
        let stream = field.map_err(multipart_error);
        Ok(Some(Blob::from_stream(filename, mime_type, length, stream)))
    }

    /// Read every blob into memory.
    pub async fn into_buffered(mut self) -> Result<Vec<Blob>> {
        let mut blobs = Vec::new();
        while let Some(mut blob) = self.next_blob().await? {
            let data = blob.bytes().await?;
            blobs.push(Blob::from_bytes(
                blob.filename().to_string(),
                blob.mime_type().to_string(),
                data,
            ));
        }
        Ok(blobs)
    }
}

impl fmt::Debug for BlobList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobList").finish_non_exhaustive()
    }
}

fn multipart_error(err: multer::Error) -> ClientError {
    match err {
        multer::Error::LockFailure => {
            ClientError::Usage("previous blob must be consumed before advancing".to_string())
        }
        other => ClientError::Decode(format!("invalid multipart answer: {}", other)),
    }
}
