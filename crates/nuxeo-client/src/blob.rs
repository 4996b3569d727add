//! Binary content with single-pass streams

use std::fmt;
use std::path::Path;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Byte stream of a blob, consumed once
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A typed binary stream: filename, MIME type, declared length and an
/// optional digest.
///
/// The stream can be taken exactly once; afterwards the metadata stays
/// readable but any further attempt to read content is a usage error.
pub struct Blob {
    filename: String,
    mime_type: String,
    length: i64,
    digest: Option<String>,
    stream: Option<ByteStream>,
}

impl Blob {
    /// Blob over an in-memory buffer
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        let length = data.len() as i64;
        Self::from_stream(
            filename,
            mime_type,
            length,
            futures::stream::once(async move { Ok(data) }),
        )
    }

    /// Blob over a caller stream; `length` is -1 when unknown.
    pub fn from_stream<S>(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        length: i64,
        stream: S,
    ) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            length,
            digest: None,
            stream: Some(Box::pin(stream)),
        }
    }

    /// Blob streaming a local file. The MIME type is guessed from the
    /// extension.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len() as i64;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let stream = ReaderStream::new(file).map_err(ClientError::Io);
        Ok(Self::from_stream(filename, mime_type, length, stream))
    }

    /// Blob over a successful download response. Reads fail with
    /// `Cancelled` once `cancel` fires.
    pub(crate) fn from_response(
        response: reqwest::Response,
        cancel: Option<CancellationToken>,
    ) -> Self {
        let headers = response.headers();
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_default();
        let mime_type = mime_type_of(headers);
        let length = declared_length(headers);
        let stream = response_stream(response, cancel);
        Self::from_stream(filename, mime_type, length, stream)
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Declared length, -1 when unknown
    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// True while the content has not been taken
    pub fn is_readable(&self) -> bool {
        self.stream.is_some()
    }

    /// Move the content stream out of the blob.
    pub fn take_stream(&mut self) -> Result<ByteStream> {
        self.stream.take().ok_or_else(|| {
            ClientError::Usage(format!("blob '{}' stream already consumed", self.filename))
        })
    }

    /// Drain the content into memory.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let mut stream = self.take_stream()?;
        let mut buffer = match self.length {
            n if n > 0 => BytesMut::with_capacity(n as usize),
            _ => BytesMut::new(),
        };
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Drain the content and decode it as UTF-8 text.
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ClientError::Decode(format!("blob is not UTF-8: {}", e)))
    }

    /// Request body streaming the content
    pub(crate) fn take_body(&mut self) -> Result<reqwest::Body> {
        Ok(reqwest::Body::wrap_stream(self.take_stream()?))
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("length", &self.length)
            .field("digest", &self.digest)
            .field("readable", &self.stream.is_some())
            .finish()
    }
}

/// Body of a response as a byte stream, cut short by `cancel`.
pub(crate) fn response_stream(
    response: reqwest::Response,
    cancel: Option<CancellationToken>,
) -> ByteStream {
    let stream = response.bytes_stream().map_err(ClientError::transport);
    match cancel {
        Some(token) => Box::pin(until_cancelled(stream, token)),
        None => Box::pin(stream),
    }
}

fn until_cancelled<S>(stream: S, token: CancellationToken) -> impl Stream<Item = Result<Bytes>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    futures::stream::unfold(Some((Box::pin(stream), token)), |state| async move {
        let (mut stream, token) = state?;
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            item = stream.next() => Some(item),
        };
        match next {
            None => Some((
                Err(ClientError::Cancelled("blob read cancelled".to_string())),
                None,
            )),
            Some(item) => item.map(|item| (item, Some((stream, token)))),
        }
    })
}

pub(crate) fn mime_type_of(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

pub(crate) fn declared_length(headers: &HeaderMap) -> i64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(-1)
}

/// Filename carried by a `Content-Disposition` value. The RFC 5987
/// `filename*` form wins over the plain one.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let raw = raw.trim().trim_matches('"');
                let encoded = match raw.split_once("''") {
                    Some((_charset, encoded)) => encoded,
                    None => raw,
                };
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    if !decoded.is_empty() {
                        return Some(decoded.into_owned());
                    }
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

/// `Content-Disposition` value announcing `filename`
pub(crate) fn disposition_for(name: &str, filename: &str) -> String {
    if filename.is_empty() {
        return format!("form-data; name=\"{}\"", name);
    }
    if filename.is_ascii() && !filename.contains('"') {
        format!("form-data; name=\"{}\"; filename=\"{}\"", name, filename)
    } else {
        format!(
            "form-data; name=\"{}\"; filename*=UTF-8''{}",
            name,
            urlencoding::encode(filename)
        )
    }
}
