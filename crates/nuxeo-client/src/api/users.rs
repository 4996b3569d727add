//! Users and groups API.

use nuxeo_core::{Group, Groups, Login, User, Users};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{CallScope, PageRequest};
use crate::client::NuxeoClient;
use crate::error::{ClientError, Result};
use crate::options::RequestOptions;
use crate::request::{encode_segment, Request, JSON};

/// Users and groups API client.
pub struct UsersApi {
    client: NuxeoClient,
    scope: CallScope,
}

impl UsersApi {
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

    /// Identity bound to the client credentials
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<Login> {
        self.request(Method::POST, "automation/login".to_string())
            .bytes(JSON, "{}")
            .fetch()
            .await
    }

    /// The user behind the client credentials
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User> {
        let login = self.login().await?;
        debug!(username = %login.username, "resolved current user");
        self.fetch_user(&login.username).await
    }

    // ==================== Users ====================

    #[instrument(skip(self))]
    pub async fn fetch_user(&self, id: &str) -> Result<User> {
        self.request(Method::GET, user_path(id)).fetch().await
    }

    #[instrument(skip(self, user), fields(id = %user.id))]
    pub async fn create_user(&self, user: &User) -> Result<User> {
        self.request(Method::POST, "user".to_string())
            .json(user)?
            .fetch()
            .await
    }

    #[instrument(skip(self, user), fields(id = %user.id))]
    pub async fn update_user(&self, user: &User) -> Result<User> {
        if user.id.is_empty() {
            return Err(ClientError::Usage("user has no id".to_string()));
        }
        self.request(Method::PUT, user_path(&user.id))
            .json(user)?
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, user_path(id)).execute().await
    }

    #[instrument(skip(self, page))]
    pub async fn search_users(&self, query: &str, page: Option<PageRequest>) -> Result<Users> {
        let request = self
            .request(Method::GET, "user/search".to_string())
            .query("q", query);
        page.unwrap_or_default().apply(request).fetch().await
    }

    // ==================== Groups ====================

    #[instrument(skip(self))]
    pub async fn fetch_group(&self, name: &str) -> Result<Group> {
        self.request(Method::GET, group_path(name)).fetch().await
    }

    #[instrument(skip(self, group), fields(name = %group.name))]
    pub async fn create_group(&self, group: &Group) -> Result<Group> {
        self.request(Method::POST, "group".to_string())
            .json(group)?
            .fetch()
            .await
    }

    #[instrument(skip(self, group), fields(name = %group.name))]
    pub async fn update_group(&self, group: &Group) -> Result<Group> {
        if group.name.is_empty() {
            return Err(ClientError::Usage("group has no name".to_string()));
        }
        self.request(Method::PUT, group_path(&group.name))
            .json(group)?
            .fetch()
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_group(&self, name: &str) -> Result<()> {
        self.request(Method::DELETE, group_path(name)).execute().await
    }

    #[instrument(skip(self, page))]
    pub async fn search_groups(&self, query: &str, page: Option<PageRequest>) -> Result<Groups> {
        let request = self
            .request(Method::GET, "group/search".to_string())
            .query("q", query);
        page.unwrap_or_default().apply(request).fetch().await
    }

    // ==================== Membership ====================

    /// Add `user` to `group` through the group resource.
    #[instrument(skip(self))]
    pub async fn add_user_to_group(&self, group: &str, user: &str) -> Result<User> {
        let path = format!("{}/user/{}", group_path(group), encode_segment(user));
        self.request(Method::POST, path).fetch().await
    }

    /// Add `user` to `group` through the user resource.
    #[instrument(skip(self))]
    pub async fn attach_group_to_user(&self, user: &str, group: &str) -> Result<User> {
        let path = format!("{}/group/{}", user_path(user), encode_segment(group));
        self.request(Method::POST, path).fetch().await
    }

    #[instrument(skip(self))]
    pub async fn remove_user_from_group(&self, group: &str, user: &str) -> Result<()> {
        let path = format!("{}/user/{}", group_path(group), encode_segment(user));
        self.request(Method::DELETE, path).execute().await
    }

    /// Users directly in `group`
    #[instrument(skip(self, page))]
    pub async fn group_member_users(
        &self,
        group: &str,
        page: Option<PageRequest>,
    ) -> Result<Users> {
        let request = self.request(Method::GET, format!("{}/@users", group_path(group)));
        page.unwrap_or_default().apply(request).fetch().await
    }

    /// Sub-groups of `group`
    #[instrument(skip(self, page))]
    pub async fn group_member_groups(
        &self,
        group: &str,
        page: Option<PageRequest>,
    ) -> Result<Groups> {
        let request = self.request(Method::GET, format!("{}/@groups", group_path(group)));
        page.unwrap_or_default().apply(request).fetch().await
    }
}

fn user_path(id: &str) -> String {
    format!("user/{}", encode_segment(id))
}

fn group_path(name: &str) -> String {
    format!("group/{}", encode_segment(name))
}
