//! Capabilities API.

use nuxeo_core::Capabilities;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::CallScope;
use crate::client::NuxeoClient;
use crate::error::Result;
use crate::options::RequestOptions;

/// Capabilities API client.
pub struct CapabilitiesApi {
    client: NuxeoClient,
    scope: CallScope,
}

impl CapabilitiesApi {
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

    /// What the Server advertises: distribution, cluster and repository
    /// features.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Capabilities> {
        self.scope
            .request(&self.client, Method::GET, "capabilities".to_string())
            .fetch()
            .await
    }
}
