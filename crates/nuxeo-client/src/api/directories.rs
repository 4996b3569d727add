//! Directories API.

use nuxeo_core::{DirectoryEntries, DirectoryEntry};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{CallScope, PageRequest};
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::encode_segment;

/// Directories API client.
pub struct DirectoriesApi {
    client: NuxeoClient,
    scope: CallScope,
}

impl DirectoriesApi {
    pub(crate) fn new(client: NuxeoClient) -> Self {
        Self {
            client,
            scope: CallScope::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.scope.set_options(options);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.scope.set_cancel(token);
        self
    }

    /// Entries of a directory
    #[instrument(skip(self))]
    pub async fn entries(
        &self,
        directory: &str,
        page: Option<PageRequest>,
    ) -> Result<DirectoryEntries> {
        let request = self
            .scope
            .request(&self.client, Method::GET, directory_path(directory));
        page.unwrap_or_default().apply(request).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn entry(&self, directory: &str, id: &str) -> Result<DirectoryEntry> {
        self.scope
            .request(&self.client, Method::GET, entry_path(directory, id))
            .fetch()
            .await
    }

    /// Create an entry in its own directory.
    #[instrument(skip(self, entry), fields(directory = %entry.directory_name))]
    pub async fn create(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry> {
        self.scope
            .request(&self.client, Method::POST, directory_path(&entry.directory_name))
            .json(entry)?
            .fetch()
            .await
    }

    #[instrument(skip(self, entry), fields(directory = %entry.directory_name))]
    pub async fn update(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry> {
        let id = entry
            .id()
            .ok_or_else(|| ClientError::Usage("directory entry has no id property".to_string()))?;
        self.scope
            .request(&self.client, Method::PUT, entry_path(&entry.directory_name, &id))
            .json(entry)?
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, directory: &str, id: &str) -> Result<()> {
        self.scope
            .request(&self.client, Method::DELETE, entry_path(directory, id))
            .execute()
            .await
    }
}

fn directory_path(directory: &str) -> String {
    format!("directory/{}", encode_segment(directory))
}

fn entry_path(directory: &str, id: &str) -> String {
    format!("{}/{}", directory_path(directory), encode_segment(id))
}
