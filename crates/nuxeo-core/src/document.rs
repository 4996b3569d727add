//! Repository documents

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{ContextParameters, Paginable};
use crate::field::Field;
use crate::time::Iso8601Time;

/// Schema reference carried by a document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
}

/// A repository node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "entity-type", default = "document_entity_type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Iso8601Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_checked_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_version: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_record: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_until: Option<Iso8601Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_legal_hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_under_retention_or_legal_hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<DocumentSchema>,
    #[serde(default)]
    pub properties: BTreeMap<String, Field>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context_parameters: ContextParameters,
}

fn document_entity_type() -> String {
    "document".to_string()
}

impl Document {
    /// A new, not yet persisted document of the given type and name.
    pub fn new(doc_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut doc = Self {
            doc_type: doc_type.into(),
            ..Default::default()
        };
        doc.set_name(name);
        doc
    }

    /// Document name; for new documents the Server reads it from `name`.
    pub fn name(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|s| !s.is_empty())
    }

    fn set_name(&mut self, name: impl Into<String>) {
        self.path = name.into();
    }

    pub fn property(&self, name: &str) -> Option<&Field> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Field>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Field> {
        self.properties.remove(name)
    }

    pub fn has_facet(&self, facet: &str) -> bool {
        self.facets.iter().any(|f| f == facet)
    }

    pub fn is_folderish(&self) -> bool {
        self.has_facet("Folderish")
    }

    pub fn context_parameter(&self, name: &str) -> Option<&Field> {
        self.context_parameters.get(name)
    }

    /// The payload sent when creating this document under a parent: only
    /// type, name and properties matter to the Server.
    pub fn creation_payload(&self) -> NewDocument<'_> {
        NewDocument {
            entity_type: "document",
            doc_type: &self.doc_type,
            name: self.name().unwrap_or_default(),
            properties: &self.properties,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self {
            entity_type: document_entity_type(),
            repository: String::new(),
            uid: String::new(),
            path: String::new(),
            doc_type: String::new(),
            state: None,
            parent_ref: None,
            title: None,
            last_modified: None,
            version_label: None,
            change_token: None,
            is_checked_out: None,
            is_version: None,
            is_proxy: None,
            is_trashed: None,
            is_record: None,
            retain_until: None,
            has_legal_hold: None,
            is_under_retention_or_legal_hold: None,
            facets: Vec::new(),
            schemas: Vec::new(),
            properties: BTreeMap::new(),
            context_parameters: BTreeMap::new(),
        }
    }
}

/// Body of a document creation request
#[derive(Debug, Serialize)]
pub struct NewDocument<'a> {
    #[serde(rename = "entity-type")]
    entity_type: &'static str,
    #[serde(rename = "type")]
    doc_type: &'a str,
    name: &'a str,
    properties: &'a BTreeMap<String, Field>,
}

/// A page of documents
pub type Documents = Paginable<Document>;
