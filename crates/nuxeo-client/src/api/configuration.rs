//! Configuration API: document types, schemas and facets.

use nuxeo_core::{DocType, DocTypes, Facet, Schema};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::CallScope;
use crate::client::NuxeoClient;
use crate::error::Result;
use crate::options::RequestOptions;
use crate::request::{encode_segment, Request};

/// Configuration API client.
pub struct ConfigurationApi {
    client: NuxeoClient,
    scope: CallScope,
}

impl ConfigurationApi {
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

    fn get(&self, path: String) -> Request {
        self.scope.request(&self.client, Method::GET, path)
    }

    /// Every document type with the schema definitions
    #[instrument(skip(self))]
    pub async fn types(&self) -> Result<DocTypes> {
        self.get("config/types".to_string()).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn doc_type(&self, name: &str) -> Result<DocType> {
        let path = format!("config/types/{}", encode_segment(name));
        self.get(path).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn schemas(&self) -> Result<Vec<Schema>> {
        self.get("config/schemas".to_string()).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn schema(&self, name: &str) -> Result<Schema> {
        let path = format!("config/schemas/{}", encode_segment(name));
        self.get(path).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn facets(&self) -> Result<Vec<Facet>> {
        self.get("config/facets".to_string()).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn facet(&self, name: &str) -> Result<Facet> {
        let path = format!("config/facets/{}", encode_segment(name));
        self.get(path).fetch().await
    }
}
