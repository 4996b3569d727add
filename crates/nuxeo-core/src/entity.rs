//! Entity envelopes: the `entity-type` discriminator, pagination and the
//! polymorphic decoder.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::acl::Acp;
use crate::audit::LogEntries;
use crate::capabilities::Capabilities;
use crate::directory::{DirectoryEntries, DirectoryEntry};
use crate::document::{Document, Documents};
use crate::error::{CoreError, Result};
use crate::field::Field;
use crate::user::{Group, Groups, Login, User, Users};
use crate::workflow::{Task, Tasks, Workflow, Workflows};

/// Name of the JSON discriminator member
pub const ENTITY_TYPE: &str = "entity-type";

/// Context parameters attached by enrichers
pub type ContextParameters = BTreeMap<String, Field>;

/// One page of a Server-side pageable result.
///
/// The Server keeps `current_page_size == entries.len()` and
/// `is_next_page_available == current_page_index + 1 < number_of_pages`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginable<T> {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub is_paginable: bool,
    #[serde(default)]
    pub results_count: i64,
    #[serde(default)]
    pub results_count_limit: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub max_page_size: i64,
    #[serde(default)]
    pub current_page_size: i64,
    #[serde(default)]
    pub current_page_index: i64,
    #[serde(default)]
    pub current_page_offset: i64,
    #[serde(default)]
    pub number_of_pages: i64,
    #[serde(default)]
    pub is_previous_page_available: bool,
    #[serde(default)]
    pub is_next_page_available: bool,
    #[serde(default)]
    pub is_last_page_available: bool,
    #[serde(default)]
    pub is_sortable: bool,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
}

impl<T> Paginable<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the pagination counters agree with each other and with
    /// the entries carried by this page.
    pub fn is_consistent(&self) -> bool {
        if !self.is_paginable {
            return true;
        }
        let size_ok = self.current_page_size == self.entries.len() as i64;
        let next_ok = self.is_next_page_available
            == (self.current_page_index + 1 < self.number_of_pages);
        let bounds_ok = self.results_count_limit > 0
            || self.results_count < 0
            || self.current_page_index * self.page_size + self.current_page_size
                <= self.results_count;
        size_ok && next_ok && bounds_ok
    }
}

impl<T> Default for Paginable<T> {
    fn default() -> Self {
        Self {
            entity_type: String::new(),
            is_paginable: false,
            results_count: 0,
            results_count_limit: 0,
            page_size: 0,
            max_page_size: 0,
            current_page_size: 0,
            current_page_index: 0,
            current_page_offset: 0,
            number_of_pages: 0,
            is_previous_page_available: false,
            is_next_page_available: false,
            is_last_page_available: false,
            is_sortable: false,
            has_error: false,
            error_message: None,
            entries: Vec::new(),
        }
    }
}

impl<T> IntoIterator for Paginable<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Error envelope returned by the Server for 4xx/5xx responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerException {
    #[serde(rename = "entity-type")]
    pub entity_type: String,
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stacktrace: String,
}

impl ServerException {
    /// Parse the envelope; anything without `entity-type: exception` is
    /// rejected.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .filter(|e| e.entity_type == "exception")
    }
}

#[derive(Deserialize)]
struct Discriminator {
    #[serde(rename = "entity-type", default)]
    entity_type: Option<String>,
}

/// Read the `entity-type` member of a JSON object without decoding the rest.
pub fn entity_type_of(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Discriminator>(body)
        .ok()
        .and_then(|d| d.entity_type)
}

/// A decoded entity, dispatched on its `entity-type`.
#[derive(Clone, Debug)]
pub enum Entity {
    Document(Box<Document>),
    Documents(Documents),
    User(Box<User>),
    Users(Users),
    Group(Box<Group>),
    Groups(Groups),
    Login(Login),
    Workflow(Box<Workflow>),
    Workflows(Workflows),
    Task(Box<Task>),
    Tasks(Tasks),
    Acls(Acp),
    Capabilities(Box<Capabilities>),
    LogEntries(LogEntries),
    DirectoryEntry(DirectoryEntry),
    DirectoryEntries(DirectoryEntries),
    Exception(ServerException),
    /// Any other entity, kept as raw JSON.
    Other { entity_type: String, body: Field },
}

impl Entity {
    /// Decode a JSON body by its discriminator.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let entity_type = entity_type_of(body)
            .ok_or_else(|| CoreError::Decode("payload has no entity-type".to_string()))?;

        let entity = match entity_type.as_str() {
            "document" => Self::Document(Box::new(decode(body)?)),
            "documents" => Self::Documents(decode(body)?),
            "user" => Self::User(Box::new(decode(body)?)),
            "users" => Self::Users(decode(body)?),
            "group" => Self::Group(Box::new(decode(body)?)),
            "groups" => Self::Groups(decode(body)?),
            "login" => Self::Login(decode(body)?),
            "workflow" => Self::Workflow(Box::new(decode(body)?)),
            "workflows" => Self::Workflows(decode(body)?),
            "task" => Self::Task(Box::new(decode(body)?)),
            "tasks" => Self::Tasks(decode(body)?),
            "acls" => Self::Acls(decode(body)?),
            "capabilities" => Self::Capabilities(Box::new(decode(body)?)),
            "logEntries" => Self::LogEntries(decode(body)?),
            "directoryEntry" => Self::DirectoryEntry(decode(body)?),
            "directoryEntries" => Self::DirectoryEntries(decode(body)?),
            "exception" => Self::Exception(decode(body)?),
            _ => Self::Other {
                body: decode(body)?,
                entity_type,
            },
        };
        Ok(entity)
    }

    pub fn entity_type(&self) -> &str {
        match self {
            Self::Document(_) => "document",
            Self::Documents(_) => "documents",
            Self::User(_) => "user",
            Self::Users(_) => "users",
            Self::Group(_) => "group",
            Self::Groups(_) => "groups",
            Self::Login(_) => "login",
            Self::Workflow(_) => "workflow",
            Self::Workflows(_) => "workflows",
            Self::Task(_) => "task",
            Self::Tasks(_) => "tasks",
            Self::Acls(_) => "acls",
            Self::Capabilities(_) => "capabilities",
            Self::LogEntries(_) => "logEntries",
            Self::DirectoryEntry(_) => "directoryEntry",
            Self::DirectoryEntries(_) => "directoryEntries",
            Self::Exception(_) => "exception",
            Self::Other { entity_type, .. } => entity_type,
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(CoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENTS: &str = r#"{
        "entity-type": "documents",
        "isPaginable": true,
        "resultsCount": 3,
        "pageSize": 2,
        "maxPageSize": 1000,
        "currentPageSize": 1,
        "currentPageIndex": 1,
        "currentPageOffset": 2,
        "numberOfPages": 2,
        "isPreviousPageAvailable": true,
        "isNextPageAvailable": false,
        "isLastPageAvailable": false,
        "isSortable": true,
        "hasError": false,
        "errorMessage": null,
        "entries": [
            {"entity-type": "document", "uid": "c", "path": "/c", "type": "File"}
        ]
    }"#;

    #[test]
    fn test_paginated_documents_dispatch() {
        let entity = Entity::from_slice(DOCUMENTS.as_bytes()).unwrap();
        let Entity::Documents(docs) = entity else {
            panic!("expected documents");
        };
        assert!(docs.is_paginable);
        assert_eq!(docs.current_page_size as usize, docs.entries.len());
        assert_eq!(docs.entries[0].uid, "c");
        assert!(docs.is_consistent());
    }

    #[test]
    fn test_inconsistent_page_is_detected() {
        let mut docs: Documents = serde_json::from_str(DOCUMENTS).unwrap();
        docs.is_next_page_available = true;
        assert!(!docs.is_consistent());
    }

    #[test]
    fn test_unknown_entity_is_kept_raw() {
        let body = br#"{"entity-type":"thumbnail","url":"x"}"#;
        let entity = Entity::from_slice(body).unwrap();
        assert_eq!(entity.entity_type(), "thumbnail");
        match entity {
            Entity::Other { body, .. } => {
                assert_eq!(body.as_json(), r#"{"entity-type":"thumbnail","url":"x"}"#)
            }
            _ => panic!("expected raw entity"),
        }
    }

    #[test]
    fn test_missing_discriminator_is_decode_error() {
        assert!(matches!(
            Entity::from_slice(br#"{"uid":"x"}"#),
            Err(CoreError::Decode(_))
        ));
        assert!(matches!(Entity::from_slice(b"[1,2]"), Err(CoreError::Decode(_))));
    }

    #[test]
    fn test_exception_envelope() {
        let body = br#"{"entity-type":"exception","status":404,"message":"Not Found","stacktrace":""}"#;
        let exc = ServerException::from_slice(body).unwrap();
        assert_eq!(exc.status, 404);
        assert_eq!(exc.message, "Not Found");

        assert!(ServerException::from_slice(br#"{"status":404,"message":"x"}"#).is_none());
        assert!(ServerException::from_slice(b"<html>oops</html>").is_none());
    }
}
