//! Server capabilities

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::Field;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(default)]
    pub distribution_name: String,
    #[serde(default)]
    pub distribution_version: String,
    #[serde(default)]
    pub distribution_server: String,
    #[serde(default)]
    pub hotfix_version: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCapabilities {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub node_id: Option<String>,
}

/// What the Server advertises at `/capabilities`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub server: ServerCapabilities,
    #[serde(default)]
    pub cluster: ClusterCapabilities,
    /// Per-repository flags keyed by repository name
    #[serde(default)]
    pub repository: BTreeMap<String, Field>,
}
