//! Workflows and tasks API.

use nuxeo_core::{Field, Task, TaskCompletion, Tasks, Workflow, WorkflowStart, Workflows};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::CallScope;
use crate::client::NuxeoClient;
use crate::error::Result;
use crate::options::RequestOptions;
use crate::request::{encode_segment, Request};

/// Filters for listing tasks; unset filters are not sent.
#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub user_id: Option<String>,
    pub workflow_instance_id: Option<String>,
    pub workflow_model_name: Option<String>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn workflow_instance(mut self, id: impl Into<String>) -> Self {
        self.workflow_instance_id = Some(id.into());
        self
    }

    pub fn workflow_model(mut self, name: impl Into<String>) -> Self {
        self.workflow_model_name = Some(name.into());
        self
    }
}

/// Workflows and tasks API client.
pub struct WorkflowsApi {
    client: NuxeoClient,
    scope: CallScope,
}

impl WorkflowsApi {
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

    fn request(&self, method: Method, path: String) -> Request {
        self.scope.request(&self.client, method, path)
    }

    // ==================== Instances ====================

    /// Start a workflow on the documents listed in `start`.
    #[instrument(skip(self, start), fields(model = %start.workflow_model_name))]
    pub async fn start(&self, start: &WorkflowStart) -> Result<Workflow> {
        self.request(Method::POST, "workflow".to_string())
            .json(start)?
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &str) -> Result<Workflow> {
        self.request(Method::GET, workflow_path(id)).fetch().await
    }

    /// Cancel and delete a running instance.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, workflow_path(id)).execute().await
    }

    /// Route graph of an instance, kept raw
    #[instrument(skip(self))]
    pub async fn graph(&self, id: &str) -> Result<Field> {
        self.request(Method::GET, format!("{}/graph", workflow_path(id)))
            .fetch()
            .await
    }

    // ==================== Models ====================

    #[instrument(skip(self))]
    pub async fn models(&self) -> Result<Workflows> {
        self.request(Method::GET, "workflowModel".to_string())
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn model(&self, name: &str) -> Result<Workflow> {
        self.request(Method::GET, model_path(name)).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn model_graph(&self, name: &str) -> Result<Field> {
        self.request(Method::GET, format!("{}/graph", model_path(name)))
            .fetch()
            .await
    }

    // ==================== Tasks ====================

    #[instrument(skip(self))]
    pub async fn tasks(&self, filter: &TaskFilter) -> Result<Tasks> {
        self.request(Method::GET, "task".to_string())
            .query_opt("userId", filter.user_id.as_deref())
            .query_opt("workflowInstanceId", filter.workflow_instance_id.as_deref())
            .query_opt("workflowModelName", filter.workflow_model_name.as_deref())
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn task(&self, id: &str) -> Result<Task> {
        self.request(Method::GET, task_path(id)).fetch().await
    }

    /// Complete a task with one of its actions, e.g. `validate`.
    #[instrument(skip(self, completion))]
    pub async fn complete_task(
        &self,
        id: &str,
        action: &str,
        completion: &TaskCompletion,
    ) -> Result<Task> {
        let path = format!("{}/{}", task_path(id), encode_segment(action));
        self.request(Method::PUT, path).json(completion)?.fetch().await
    }

    /// Hand the task over to other actors.
    #[instrument(skip(self))]
    pub async fn reassign_task(
        &self,
        id: &str,
        actors: &[&str],
        comment: Option<&str>,
    ) -> Result<()> {
        let request = self
            .request(Method::PUT, format!("{}/reassign", task_path(id)))
            .query_pairs(actors.iter().map(|a| ("actors", *a)))
            .query_opt("comment", comment);
        request.execute().await
    }

    /// Delegate the task while keeping the original actors.
    #[instrument(skip(self))]
    pub async fn delegate_task(
        &self,
        id: &str,
        actors: &[&str],
        comment: Option<&str>,
    ) -> Result<()> {
        let request = self
            .request(Method::PUT, format!("{}/delegate", task_path(id)))
            .query_pairs(actors.iter().map(|a| ("delegatedActors", *a)))
            .query_opt("comment", comment);
        request.execute().await
    }
}

fn workflow_path(id: &str) -> String {
    format!("workflow/{}", encode_segment(id))
}

fn model_path(name: &str) -> String {
    format!("workflowModel/{}", encode_segment(name))
}

fn task_path(id: &str) -> String {
    format!("task/{}", encode_segment(id))
}
