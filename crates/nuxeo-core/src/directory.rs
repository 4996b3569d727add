//! Directory (vocabulary) entries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Paginable;
use crate::field::Field;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(rename = "entity-type", default = "directory_entry_type")]
    pub entity_type: String,
    pub directory_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Field>,
}

fn directory_entry_type() -> String {
    "directoryEntry".to_string()
}

impl DirectoryEntry {
    pub fn new(directory_name: impl Into<String>) -> Self {
        Self {
            entity_type: directory_entry_type(),
            directory_name: directory_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Entry identifier, stored in the `id` property.
    pub fn id(&self) -> Option<String> {
        self.properties.get("id").and_then(|f| f.string().ok().flatten())
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Field>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A page of directory entries
pub type DirectoryEntries = Paginable<DirectoryEntry>;
