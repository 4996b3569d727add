//! Audit log entries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Paginable;
use crate::field::Field;
use crate::time::Iso8601Time;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    pub id: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub principal_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub doc_life_cycle: Option<String>,
    #[serde(default)]
    pub doc_path: Option<String>,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(rename = "docUUID", default)]
    pub doc_uuid: Option<String>,
    pub event_id: String,
    #[serde(default)]
    pub repository_id: Option<String>,
    #[serde(default)]
    pub event_date: Option<Iso8601Time>,
    #[serde(default)]
    pub log_date: Option<Iso8601Time>,
    #[serde(default)]
    pub extended: BTreeMap<String, Field>,
}

/// A page of audit entries
pub type LogEntries = Paginable<LogEntry>;
