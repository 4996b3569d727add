//! Repository API: documents and their adapters.

use std::collections::BTreeMap;

use nuxeo_core::{Acp, Document, Documents, LogEntries, Tasks, Workflow, WorkflowStart, Workflows};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{CallScope, PageRequest};
use crate::blob::Blob;
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::{encode_path, encode_segment, Request};

/// Default blob property
pub const DEFAULT_BLOB_XPATH: &str = "file:content";

/// Reference to a document, by id or by absolute path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocRef {
    Id(String),
    Path(String),
}

impl DocRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    fn segment(&self) -> String {
        match self {
            Self::Id(id) => format!("id/{}", encode_segment(id)),
            Self::Path(path) => {
                let path = path.trim_start_matches('/');
                format!("path/{}", encode_path(path))
            }
        }
    }
}

/// Absolute paths are paths, anything else an id.
impl From<&str> for DocRef {
    fn from(value: &str) -> Self {
        if value.starts_with('/') {
            Self::Path(value.to_string())
        } else {
            Self::Id(value.to_string())
        }
    }
}

impl From<String> for DocRef {
    fn from(value: String) -> Self {
        DocRef::from(value.as_str())
    }
}

impl From<&Document> for DocRef {
    fn from(doc: &Document) -> Self {
        if doc.uid.is_empty() {
            Self::Path(doc.path.clone())
        } else {
            Self::Id(doc.uid.clone())
        }
    }
}

/// Repository API client, scoped to one repository.
pub struct RepositoryApi {
    client: NuxeoClient,
    name: String,
    scope: CallScope,
}

impl RepositoryApi {
    pub(crate) fn new(client: NuxeoClient, name: String) -> Self {
        Self {
            client,
            name,
            scope: CallScope::default(),
        }
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options applied to every call of this manager
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.scope.set_options(options);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.scope.set_cancel(token);
        self
    }

    fn doc_path(&self, doc: &DocRef) -> String {
        format!("repo/{}/{}", encode_segment(&self.name), doc.segment())
    }

    fn request(&self, method: Method, path: String) -> Request {
        self.scope.request(&self.client, method, path)
    }

    // ==================== Documents ====================

    #[instrument(skip(self), fields(repository = %self.name))]
    pub async fn fetch_root(&self) -> Result<Document> {
        self.fetch(DocRef::path("/")).await
    }

    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn fetch(&self, doc: impl Into<DocRef>) -> Result<Document> {
        let path = self.doc_path(&doc.into());
        self.request(Method::GET, path).fetch().await
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<Document> {
        self.fetch(DocRef::id(id)).await
    }

    pub async fn fetch_by_path(&self, path: &str) -> Result<Document> {
        self.fetch(DocRef::path(path)).await
    }

    /// Create `doc` under `parent`. Only the type, name and properties of
    /// `doc` are sent.
    #[instrument(skip(self, parent, doc), fields(repository = %self.name, doc_type = %doc.doc_type))]
    pub async fn create(&self, parent: impl Into<DocRef>, doc: &Document) -> Result<Document> {
        if doc.doc_type.is_empty() {
            return Err(ClientError::Usage("document type is required".to_string()));
        }
        let path = self.doc_path(&parent.into());
        self.request(Method::POST, path)
            .json(&doc.creation_payload())?
            .fetch()
            .await
    }

    /// Save the properties of an existing document.
    #[instrument(skip(self, doc), fields(repository = %self.name, uid = %doc.uid))]
    pub async fn update(&self, doc: &Document) -> Result<Document> {
        if doc.uid.is_empty() {
            return Err(ClientError::Usage("document has no uid".to_string()));
        }
        let path = self.doc_path(&DocRef::id(doc.uid.clone()));
        self.request(Method::PUT, path).json(doc)?.fetch().await
    }

    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn delete(&self, doc: impl Into<DocRef>) -> Result<()> {
        let path = self.doc_path(&doc.into());
        self.request(Method::DELETE, path).execute().await
    }

    // ==================== Adapters ====================

    /// A call on `@<adapter>[/<suffix>]` of a document, left for the
    /// caller to complete and send.
    pub fn adapter(
        &self,
        doc: impl Into<DocRef>,
        method: Method,
        adapter: &str,
        suffix: Option<&str>,
    ) -> Request {
        let mut path = format!("{}/@{}", self.doc_path(&doc.into()), encode_segment(adapter));
        if let Some(suffix) = suffix.map(|s| s.trim_start_matches('/')).filter(|s| !s.is_empty()) {
            path.push('/');
            path.push_str(&encode_path(suffix));
        }
        self.request(method, path)
    }

    #[instrument(skip(self, parent), fields(repository = %self.name))]
    pub async fn children(
        &self,
        parent: impl Into<DocRef>,
        page: Option<PageRequest>,
    ) -> Result<Documents> {
        let request = self.adapter(parent, Method::GET, "children", None);
        page.unwrap_or_default().apply(request).fetch().await
    }

    /// Access control of a document
    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn acp(&self, doc: impl Into<DocRef>) -> Result<Acp> {
        self.adapter(doc, Method::GET, "acl", None).fetch().await
    }

    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn audit(
        &self,
        doc: impl Into<DocRef>,
        page: Option<PageRequest>,
    ) -> Result<LogEntries> {
        let request = self.adapter(doc, Method::GET, "audit", None);
        page.unwrap_or_default().apply(request).fetch().await
    }

    /// Stream the blob stored at `xpath`, `file:content` by default.
    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn blob(&self, doc: impl Into<DocRef>, xpath: Option<&str>) -> Result<Blob> {
        let xpath = xpath.unwrap_or(DEFAULT_BLOB_XPATH);
        self.adapter(doc, Method::GET, "blob", Some(xpath))
            .fetch_blob()
            .await
    }

    /// Workflow instances running on a document
    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn workflows(&self, doc: impl Into<DocRef>) -> Result<Workflows> {
        self.adapter(doc, Method::GET, "workflow", None).fetch().await
    }

    #[instrument(skip(self, doc, start), fields(repository = %self.name, model = %start.workflow_model_name))]
    pub async fn start_workflow(
        &self,
        doc: impl Into<DocRef>,
        start: &WorkflowStart,
    ) -> Result<Workflow> {
        self.adapter(doc, Method::POST, "workflow", None)
            .json(start)?
            .fetch()
            .await
    }

    /// Open tasks on a document
    #[instrument(skip(self, doc), fields(repository = %self.name))]
    pub async fn tasks(&self, doc: impl Into<DocRef>) -> Result<Tasks> {
        self.adapter(doc, Method::GET, "task", None).fetch().await
    }

    // ==================== Queries ====================

    /// Run an NXQL query; `?` placeholders are bound from `params`.
    #[instrument(skip(self, params, page))]
    pub async fn query(
        &self,
        nxql: &str,
        params: &[&str],
        page: Option<PageRequest>,
    ) -> Result<Documents> {
        let mut request = self.request(Method::GET, "query".to_string()).query("query", nxql);
        if !params.is_empty() {
            request = request.query("queryParams", params.join(","));
        }
        page.unwrap_or_default().apply(request).fetch().await
    }

    /// Run a named page provider with positional and named parameters.
    #[instrument(skip(self, params, named, page))]
    pub async fn query_provider(
        &self,
        provider: &str,
        params: &[&str],
        named: &BTreeMap<String, String>,
        page: Option<PageRequest>,
    ) -> Result<Documents> {
        let path = format!("query/{}", encode_segment(provider));
        let mut request = self.request(Method::GET, path);
        if !params.is_empty() {
            request = request.query("queryParams", params.join(","));
        }
        request = request.query_pairs(named.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        page.unwrap_or_default().apply(request).fetch().await
    }
}
