//! Manager catalogues, one per area of the REST API.

mod capabilities;
mod configuration;
mod directories;
mod repository;
mod users;
mod workflows;

pub use capabilities::CapabilitiesApi;
pub use configuration::ConfigurationApi;
pub use directories::DirectoriesApi;
pub use repository::{DocRef, RepositoryApi};
pub use users::UsersApi;
pub use workflows::{TaskFilter, WorkflowsApi};

use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::client::NuxeoClient;
use crate::options::RequestOptions;
use crate::request::Request;

/// Page selection for paginated endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub current_page_index: Option<u64>,
    pub page_size: Option<u64>,
    pub max_results: Option<u64>,
    pub sort_by: Vec<String>,
    pub sort_order: Vec<String>,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page `index` (zero-based) of `size` entries
    pub fn page(index: u64, size: u64) -> Self {
        Self {
            current_page_index: Some(index),
            page_size: Some(size),
            ..Default::default()
        }
    }

    pub fn max_results(mut self, max: u64) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Sort on `field`, ascending or descending
    pub fn sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort_by.push(field.into());
        self.sort_order
            .push(if ascending { "asc" } else { "desc" }.to_string());
        self
    }

    pub(crate) fn apply(&self, request: Request) -> Request {
        let mut request = request
            .query_opt("currentPageIndex", self.current_page_index)
            .query_opt("pageSize", self.page_size)
            .query_opt("maxResults", self.max_results);
        if !self.sort_by.is_empty() {
            request = request.query("sortBy", self.sort_by.join(","));
        }
        if !self.sort_order.is_empty() {
            request = request.query("sortOrder", self.sort_order.join(","));
        }
        request
    }
}

/// Options and cancellation shared by every call of one manager
#[derive(Clone, Debug, Default)]
pub(crate) struct CallScope {
    options: Option<RequestOptions>,
    cancel: Option<CancellationToken>,
}

impl CallScope {
    pub(crate) fn set_options(&mut self, options: RequestOptions) {
        self.options = Some(options);
    }

    pub(crate) fn set_cancel(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    pub(crate) fn request(&self, client: &NuxeoClient, method: Method, path: String) -> Request {
        client
            .request(method, path)
            .options_opt(self.options.clone())
            .cancel_opt(self.cancel.clone())
    }
}
