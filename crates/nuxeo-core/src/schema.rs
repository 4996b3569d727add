//! Server configuration: schemas, facets and document types.
//!
//! Field types arrive either as a bare string (`"string"`, `"long[]"`) or
//! as a nested object (`{"type": "complex", "fields": {...}}`). A trailing
//! `[]` is stripped into [`FieldType::is_array`]. Schemas may carry their
//! prefix as an `@prefix` pseudo-field; it is lifted into
//! [`Schema::prefix`] and never stored as a field.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::field::Field;

const PREFIX_FIELD: &str = "@prefix";
const ARRAY_SUFFIX: &str = "[]";

/// Type of one schema field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldType {
    /// Base type name without the array suffix (`string`, `long`, `complex`, ...)
    pub type_name: String,
    pub is_array: bool,
    /// Sub-fields of a complex type
    pub fields: BTreeMap<String, FieldType>,
}

impl FieldType {
    fn parse(type_name: &str, fields: BTreeMap<String, FieldType>) -> Self {
        let (base, is_array) = match type_name.strip_suffix(ARRAY_SUFFIX) {
            Some(base) => (base, true),
            None => (type_name, false),
        };
        Self {
            type_name: base.to_string(),
            is_array,
            fields,
        }
    }

    pub fn is_complex(&self) -> bool {
        self.type_name == "complex" || !self.fields.is_empty()
    }

    fn full_name(&self) -> String {
        if self.is_array {
            format!("{}{}", self.type_name, ARRAY_SUFFIX)
        } else {
            self.type_name.clone()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldType {
    Name(String),
    Nested {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        fields: BTreeMap<String, RawFieldType>,
    },
}

impl From<RawFieldType> for FieldType {
    fn from(raw: RawFieldType) -> Self {
        match raw {
            RawFieldType::Name(name) => FieldType::parse(&name, BTreeMap::new()),
            RawFieldType::Nested { type_name, fields } => FieldType::parse(
                &type_name,
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawFieldType::deserialize(deserializer).map(Into::into)
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.fields.is_empty() {
            return serializer.serialize_str(&self.full_name());
        }
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", &self.full_name())?;
        map.serialize_entry("fields", &self.fields)?;
        map.end()
    }
}

/// A named group of fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    pub fields: BTreeMap<String, FieldType>,
}

#[derive(Deserialize)]
struct RawSchema {
    name: String,
    #[serde(default, alias = "@prefix")]
    prefix: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, RawFieldType>,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSchema::deserialize(deserializer)?;
        let mut prefix = raw.prefix.unwrap_or_default();
        let mut fields = BTreeMap::new();
        for (name, field_type) in raw.fields {
            match (name.as_str(), field_type) {
                (PREFIX_FIELD, RawFieldType::Name(value)) => prefix = value,
                (PREFIX_FIELD, RawFieldType::Nested { type_name, .. }) => prefix = type_name,
                (_, field_type) => {
                    fields.insert(name, field_type.into());
                }
            }
        }
        Ok(Self {
            name: raw.name,
            prefix,
            fields,
        })
    }
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }

    /// Property name as used in documents, e.g. `dc:title`.
    pub fn qualified(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}:{}", self.name, field)
        } else {
            format!("{}:{}", self.prefix, field)
        }
    }
}

/// A capability tag bundling schemas
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Facet {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

/// A document type with its resolved schemas
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocType {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

/// Document type entry of the `/config/types` listing, schemas by name
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocTypeSummary {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<String>,
}

/// Full `/config/types` payload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocTypes {
    #[serde(default)]
    pub doctypes: BTreeMap<String, DocTypeSummary>,
    /// Schema definitions keyed by name, kept raw since their layout varies
    /// across Server versions
    #[serde(default)]
    pub schemas: BTreeMap<String, Field>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUBLINCORE: &str = r#"{
        "name": "dublincore",
        "@prefix": "dc",
        "fields": {
            "title": "string",
            "contributors": "string[]",
            "modified": "date",
            "expired": "date",
            "issued": "date",
            "version": "long"
        }
    }"#;

    #[test]
    fn test_prefix_attribute() {
        let schema: Schema = serde_json::from_str(DUBLINCORE).unwrap();
        assert_eq!(schema.prefix, "dc");
        assert_eq!(schema.qualified("title"), "dc:title");
        let contributors = schema.field("contributors").unwrap();
        assert_eq!(contributors.type_name, "string");
        assert!(contributors.is_array);
        assert!(!schema.field("version").unwrap().is_array);
    }

    #[test]
    fn test_prefix_pseudo_field_is_lifted() {
        let json = r#"{"name": "file", "fields": {"@prefix": "file", "content": "blob"}}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.prefix, "file");
        assert!(schema.field("@prefix").is_none());
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.field("content").unwrap().type_name, "blob");
    }

    #[test]
    fn test_nested_complex_types() {
        let json = r#"{
            "name": "files",
            "prefix": "files",
            "fields": {
                "files": {
                    "type": "complex[]",
                    "fields": {
                        "file": "blob",
                        "tags": "string[]",
                        "meta": {"type": "complex", "fields": {"rank": "long"}}
                    }
                }
            }
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        let files = schema.field("files").unwrap();
        assert!(files.is_complex());
        assert!(files.is_array);
        assert_eq!(files.type_name, "complex");
        assert!(files.fields["tags"].is_array);
        assert_eq!(files.fields["meta"].fields["rank"].type_name, "long");
    }

    #[test]
    fn test_serialize_restores_array_suffix() {
        let schema: Schema = serde_json::from_str(DUBLINCORE).unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["prefix"], "dc");
        assert_eq!(json["fields"]["contributors"], "string[]");
    }

    #[test]
    fn test_doc_type_and_facet() {
        let doc_type: DocType = serde_json::from_str(&format!(
            r#"{{"name":"File","parent":"Document","facets":["Downloadable"],"schemas":[{}]}}"#,
            DUBLINCORE
        ))
        .unwrap();
        assert_eq!(doc_type.parent.as_deref(), Some("Document"));
        assert_eq!(doc_type.schemas[0].prefix, "dc");

        let facet: Facet = serde_json::from_str(&format!(
            r#"{{"name":"Folderish","schemas":[{}]}}"#,
            DUBLINCORE
        ))
        .unwrap();
        assert_eq!(facet.schemas.len(), 1);
    }
}
