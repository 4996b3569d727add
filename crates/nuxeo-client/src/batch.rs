//! Batch upload engine.
//!
//! All session state lives on the Server, keyed by batch id; the engine
//! keeps nothing between calls. Chunks of one file may be sent in
//! parallel, the caller keeping chunk indices unique and waiting for every
//! chunk before executing an operation on the batch.

use nuxeo_core::{BatchInfo, BatchUpload};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::automation::{run, Operation, OperationResponse};
use crate::blob::{Blob, OCTET_STREAM};
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::encode_segment;

pub const FILE_NAME_HEADER: &str = "X-File-Name";
pub const FILE_TYPE_HEADER: &str = "X-File-Type";
pub const FILE_SIZE_HEADER: &str = "X-File-Size";
pub const UPLOAD_TYPE_HEADER: &str = "X-Upload-Type";
pub const CHUNK_INDEX_HEADER: &str = "X-Upload-Chunk-Index";
pub const CHUNK_COUNT_HEADER: &str = "X-Upload-Chunk-Count";

/// Position of one chunk within a file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub count: u64,
}

impl Chunk {
    pub fn new(index: u64, count: u64) -> Result<Self> {
        if count == 0 || index >= count {
            return Err(ClientError::Usage(format!(
                "chunk index {} out of range for {} chunks",
                index, count
            )));
        }
        Ok(Self { index, count })
    }
}

/// Per-file upload options
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// Overrides the blob filename
    pub file_name: Option<String>,
    /// Overrides the blob MIME type
    pub file_type: Option<String>,
    /// Total file size. Whole-file uploads default to the blob length;
    /// chunked uploads send it only when set here.
    pub file_size: Option<u64>,
    pub request: Option<RequestOptions>,
    pub cancel: Option<CancellationToken>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn file_type(mut self, mime_type: impl Into<String>) -> Self {
        self.file_type = Some(mime_type.into());
        self
    }

    pub fn file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request = Some(options);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Batch upload API
pub struct BatchUploadApi {
    client: NuxeoClient,
}

impl BatchUploadApi {
    pub(crate) fn new(client: NuxeoClient) -> Self {
        Self { client }
    }

    /// Open a new batch.
    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<BatchInfo> {
        let info: BatchInfo = self.client.request(Method::POST, "upload/").fetch().await?;
        debug!(batch_id = %info.batch_id, "batch created");
        Ok(info)
    }

    /// Upload a whole file in one request.
    #[instrument(skip(self, blob, options), fields(filename = %blob.filename()))]
    pub async fn upload(
        &self,
        batch_id: &str,
        file_idx: &str,
        blob: Blob,
        options: UploadOptions,
    ) -> Result<BatchUpload> {
        self.send(batch_id, file_idx, blob, options, None).await
    }

    /// Upload one chunk of a file. The answer reports the progress known
    /// to the Server.
    #[instrument(skip(self, blob, options), fields(index = chunk.index, count = chunk.count))]
    pub async fn upload_chunk(
        &self,
        batch_id: &str,
        file_idx: &str,
        chunk: Chunk,
        blob: Blob,
        options: UploadOptions,
    ) -> Result<BatchUpload> {
        Chunk::new(chunk.index, chunk.count)?;
        self.send(batch_id, file_idx, blob, options, Some(chunk)).await
    }

    async fn send(
        &self,
        batch_id: &str,
        file_idx: &str,
        mut blob: Blob,
        options: UploadOptions,
        chunk: Option<Chunk>,
    ) -> Result<BatchUpload> {
        let name = options
            .file_name
            .unwrap_or_else(|| blob.filename().to_string());
        let file_type = options
            .file_type
            .unwrap_or_else(|| blob.mime_type().to_string());
        // a chunk's own length says nothing about the whole file
        let size = match chunk {
            Some(_) => options.file_size,
            None => options
                .file_size
                .or_else(|| u64::try_from(blob.length()).ok()),
        };

        let mut request = self
            .client
            .request(Method::POST, file_path(batch_id, file_idx))
            .header(FILE_NAME_HEADER, urlencoding::encode(&name).into_owned())
            .header(FILE_TYPE_HEADER, file_type)
            .options_opt(options.request)
            .cancel_opt(options.cancel);
        if let Some(size) = size {
            request = request.header(FILE_SIZE_HEADER, size.to_string());
        }
        request = match chunk {
            Some(chunk) => request
                .header(UPLOAD_TYPE_HEADER, "chunked")
                .header(CHUNK_INDEX_HEADER, chunk.index.to_string())
                .header(CHUNK_COUNT_HEADER, chunk.count.to_string()),
            None => request.header(UPLOAD_TYPE_HEADER, "normal"),
        };

        let upload: BatchUpload = request
            .stream(OCTET_STREAM, blob.take_body()?)
            .fetch()
            .await?;
        debug!(uploaded_size = ?upload.uploaded_size, "upload accepted");
        Ok(upload)
    }

    /// Every file of a batch
    #[instrument(skip(self))]
    pub async fn fetch_uploads(&self, batch_id: &str) -> Result<Vec<BatchUpload>> {
        let path = format!("upload/{}", encode_segment(batch_id));
        // an empty batch answers 204 or null depending on the Server version
        let body: Option<nuxeo_core::Field> =
            self.client.request(Method::GET, path).fetch_optional().await?;
        match body {
            Some(body) => Ok(body.decode_list()?),
            None => Ok(Vec::new()),
        }
    }

    /// One file of a batch
    #[instrument(skip(self))]
    pub async fn fetch_upload(&self, batch_id: &str, file_idx: &str) -> Result<BatchUpload> {
        self.client
            .request(Method::GET, file_path(batch_id, file_idx))
            .fetch()
            .await
    }

    /// Drop the batch and its files.
    #[instrument(skip(self))]
    pub async fn cancel(&self, batch_id: &str) -> Result<()> {
        let path = format!("upload/{}", encode_segment(batch_id));
        self.client.request(Method::DELETE, path).execute().await
    }

    /// Run `operation` with every file of the batch as input.
    #[instrument(skip(self, operation), fields(operation = %operation.id()))]
    pub async fn execute_all(
        &self,
        batch_id: &str,
        operation: Operation,
    ) -> Result<OperationResponse> {
        let path = format!(
            "upload/{}/execute/{}",
            encode_segment(batch_id),
            encode_segment(operation.id())
        );
        run(&self.client, path, operation, false).await
    }

    /// Run `operation` with one file of the batch as input.
    #[instrument(skip(self, operation), fields(operation = %operation.id()))]
    pub async fn execute_one(
        &self,
        batch_id: &str,
        file_idx: &str,
        operation: Operation,
    ) -> Result<OperationResponse> {
        let path = format!(
            "{}/execute/{}",
            file_path(batch_id, file_idx),
            encode_segment(operation.id())
        );
        run(&self.client, path, operation, false).await
    }
}

fn file_path(batch_id: &str, file_idx: &str) -> String {
    format!(
        "upload/{}/{}",
        encode_segment(batch_id),
        encode_segment(file_idx)
    )
}
