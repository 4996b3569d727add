//! Access control: ACP / ACL / ACE

use serde::{Deserialize, Serialize};

use crate::time::Iso8601Time;

/// Name of the ACL holding permissions set directly on a document
pub const LOCAL_ACL: &str = "local";
/// Name of the ACL holding permissions inherited from ancestors
pub const INHERITED_ACL: &str = "inherited";

/// Status of an entry with a time window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AceStatus {
    Pending,
    Effective,
    Archived,
}

/// One permission entry
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ace {
    #[serde(default)]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub external_user: bool,
    pub permission: String,
    pub granted: bool,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub begin: Option<Iso8601Time>,
    #[serde(default)]
    pub end: Option<Iso8601Time>,
    #[serde(default)]
    pub status: Option<AceStatus>,
}

/// A named list of entries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Acl {
    pub name: String,
    #[serde(default, rename = "ace")]
    pub aces: Vec<Ace>,
}

/// The full permission tree of a document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Acp {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    #[serde(default, rename = "acl")]
    pub acls: Vec<Acl>,
}

impl Acp {
    pub fn acl(&self, name: &str) -> Option<&Acl> {
        self.acls.iter().find(|acl| acl.name == name)
    }

    pub fn local(&self) -> Option<&Acl> {
        self.acl(LOCAL_ACL)
    }

    pub fn inherited(&self) -> Option<&Acl> {
        self.acl(INHERITED_ACL)
    }

    /// Effective, granted entries for a user across all ACLs.
    pub fn granted_to<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a Ace> + 'a {
        self.acls
            .iter()
            .flat_map(|acl| acl.aces.iter())
            .filter(move |ace| {
                ace.username == username
                    && ace.granted
                    && !matches!(ace.status, Some(AceStatus::Pending | AceStatus::Archived))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_acp() {
        let json = r#"{
            "entity-type": "acls",
            "acl": [
                {"name": "local", "ace": [
                    {"id": "jdoe:Read:true:Administrator:2020-01-01T00:00:00.000Z:",
                     "username": "jdoe", "externalUser": false, "permission": "Read",
                     "granted": true, "creator": "Administrator",
                     "begin": "2020-01-01T00:00:00.000Z", "end": null, "status": "effective"}
                ]},
                {"name": "inherited", "ace": [
                    {"id": "Administrator:Everything:true:::", "username": "Administrator",
                     "externalUser": false, "permission": "Everything", "granted": true,
                     "creator": null, "begin": null, "end": null, "status": "effective"}
                ]}
            ]
        }"#;

        let acp: Acp = serde_json::from_str(json).unwrap();
        assert_eq!(acp.acls.len(), 2);
        let local = acp.local().unwrap();
        assert_eq!(local.aces[0].permission, "Read");
        assert!(local.aces[0].begin.is_some());
        assert_eq!(acp.inherited().unwrap().aces[0].username, "Administrator");
        assert_eq!(acp.granted_to("jdoe").count(), 1);
        assert_eq!(acp.granted_to("nobody").count(), 0);
    }
}
