//! Users and groups

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Paginable;
use crate::field::Field;

/// Group reference carried in a user's `extendedGroups`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupRef {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "entity-type", default = "user_entity_type")]
    pub entity_type: String,
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended_groups: Vec<GroupRef>,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub is_anonymous: bool,
}

fn user_entity_type() -> String {
    "user".to_string()
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut properties = BTreeMap::new();
        properties.insert("username".to_string(), Field::from(id.as_str()));
        Self {
            entity_type: user_entity_type(),
            id,
            properties,
            extended_groups: Vec::new(),
            is_administrator: false,
            is_anonymous: false,
        }
    }

    fn string_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).and_then(|f| f.string().ok().flatten())
    }

    pub fn first_name(&self) -> Option<String> {
        self.string_property("firstName")
    }

    pub fn last_name(&self) -> Option<String> {
        self.string_property("lastName")
    }

    pub fn email(&self) -> Option<String> {
        self.string_property("email")
    }

    /// Groups listed in the `groups` property
    pub fn groups(&self) -> Vec<String> {
        self.properties
            .get("groups")
            .and_then(|f| f.strings().ok())
            .unwrap_or_default()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Field>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A page of users
pub type Users = Paginable<User>;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "entity-type", default = "group_entity_type")]
    pub entity_type: String,
    #[serde(rename = "groupname", alias = "id", alias = "name")]
    pub name: String,
    #[serde(rename = "grouplabel", alias = "label", default)]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_groups: Vec<String>,
}

fn group_entity_type() -> String {
    "group".to_string()
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entity_type: group_entity_type(),
            name: name.into(),
            label: None,
            member_users: Vec::new(),
            member_groups: Vec::new(),
            parent_groups: Vec::new(),
        }
    }
}

/// A page of groups
pub type Groups = Paginable<Group>;

/// Result of `automation/login`: the identity bound to the credentials
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    pub username: String,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}
