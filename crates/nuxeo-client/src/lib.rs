//! # Nuxeo Client SDK
//!
//! An async client for the Nuxeo REST and Automation APIs.
//!
//! ## Features
//!
//! - **Authentication**: basic, bearer, Server token and OAuth2 (JWT,
//!   client credentials, authorization code)
//! - **Request options**: enrichers, fetched and translated properties,
//!   schemas, depth, versioning and timeouts, all header-encoded
//! - **Automation**: document and blob inputs, multipart encoding and a
//!   polymorphic response with lazy multipart blob lists
//! - **Batch upload**: normal and chunked uploads, status, cancellation
//!   and operation execution on a batch
//! - **Managers**: repository, users and groups, workflows and tasks,
//!   directories, configuration and capabilities
//!
//! ## Example
//!
//! ```rust,no_run
//! use nuxeo_client::{Blob, NuxeoClient, Operation, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> nuxeo_client::Result<()> {
//!     let client = NuxeoClient::builder()
//!         .base_url("http://localhost:8080/nuxeo")
//!         .basic_auth("Administrator", "Administrator")
//!         .default_options(RequestOptions::new().schema("dublincore"))
//!         .build()?;
//!
//!     let caps = client.capabilities().fetch().await?;
//!     println!("Server {}", caps.server.distribution_version);
//!
//!     let op = Operation::new("Blob.AttachOnDocument")
//!         .param("document", "/default-domain/workspaces/ws/note")
//!         .input_blob(Blob::from_bytes("hello.txt", "text/plain", "hello"));
//!     client.automation().execute(op).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod automation;
pub mod batch;
pub mod blob;
mod client;
mod config;
mod error;
pub mod options;
mod request;

pub use api::{
    CapabilitiesApi, ConfigurationApi, DirectoriesApi, DocRef, PageRequest, RepositoryApi,
    TaskFilter, UsersApi, WorkflowsApi,
};
pub use auth::{
    Authenticator, BasicAuthenticator, BearerAuthenticator, NoAuth, OAuth2Authenticator,
    OAuth2Config, OAuth2Mode, OAuth2Token, TokenAuthenticator,
};
pub use automation::{
    AutomationApi, BlobList, Operation, OperationInput, OperationResponse, ParamValue,
};
pub use batch::{BatchUploadApi, Chunk, UploadOptions};
pub use blob::{Blob, ByteStream};
pub use client::{ClientBuilder, NuxeoClient};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use options::{RequestOptions, VersioningOption};
pub use request::Request;

pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;

// Entity model
pub use nuxeo_core;
