//! # Nuxeo Core
//!
//! Typed entity model for the Nuxeo REST and Automation APIs.
//!
//! This crate provides:
//! - **Field**: polymorphic JSON values with lazy typed accessors
//! - **Entities**: documents, users, groups, workflows, tasks, ACLs,
//!   audit entries, directory entries and server capabilities
//! - **Pagination**: the pageable envelope shared by list endpoints
//! - **Configuration**: schemas, facets and document types
//! - **Uploads**: batch descriptors and upload references
//!
//! Nothing here performs I/O; see `nuxeo-client` for the transport.

pub mod acl;
pub mod audit;
pub mod capabilities;
pub mod directory;
pub mod document;
pub mod entity;
pub mod error;
pub mod field;
pub mod schema;
pub mod time;
pub mod upload;
pub mod user;
pub mod workflow;

pub use acl::{Ace, AceStatus, Acl, Acp};
pub use audit::{LogEntries, LogEntry};
pub use capabilities::Capabilities;
pub use directory::{DirectoryEntries, DirectoryEntry};
pub use document::{Document, Documents};
pub use entity::{ContextParameters, Entity, Paginable, ServerException};
pub use error::{CoreError, Result};
pub use field::{Field, FieldKind};
pub use schema::{DocType, DocTypes, Facet, FieldType, Schema};
pub use time::Iso8601Time;
pub use upload::{BatchInfo, BatchUpload, BlobInfo, UploadInfo, UploadState, UploadType};
pub use user::{Group, Groups, Login, User, Users};
pub use workflow::{Task, TaskCompletion, Tasks, Workflow, WorkflowStart, Workflows};
