//! Decoding of realistic Server payloads.

use nuxeo_core::{Entity, Field, FieldKind};

const DOCUMENT: &str = r#"{
    "entity-type": "document",
    "repository": "default",
    "uid": "9b5a2b1e-1c44-4e3b-a5c1-0d2b7d3f9a10",
    "path": "/default-domain/workspaces/ws/contract",
    "type": "File",
    "state": "project",
    "parentRef": "b4d3b6a2-7a4c-4a33-9c3e-2f6d8e1f0c21",
    "isCheckedOut": true,
    "isVersion": false,
    "changeToken": "1-0",
    "title": "contract",
    "lastModified": "2023-05-12T09:30:11.123Z",
    "facets": ["Versionable", "Commentable", "Downloadable"],
    "properties": {
        "dc:title": "contract",
        "dc:subjects": ["art/cinema", "sciences/astronomy"],
        "dc:created": "2023-05-12T09:30:11.123+02:00",
        "file:content": {
            "name": "contract.pdf",
            "mime-type": "application/pdf",
            "length": "30245",
            "digest": "0a1b2c"
        },
        "uid:major_version": 1,
        "common:size": null
    },
    "contextParameters": {
        "breadcrumb": { "entity-type": "documents", "entries": [] }
    }
}"#;

#[test]
fn test_document_payload() {
    let entity = Entity::from_slice(DOCUMENT.as_bytes()).unwrap();
    let Entity::Document(doc) = entity else {
        panic!("expected a document");
    };

    assert_eq!(doc.name(), Some("contract"));
    assert!(doc.has_facet("Versionable"));
    assert!(!doc.is_folderish());
    assert_eq!(doc.is_checked_out, Some(true));

    let subjects = doc.property("dc:subjects").unwrap();
    assert_eq!(subjects.kind(), FieldKind::List);
    assert_eq!(subjects.strings().unwrap().len(), 2);

    let created = doc.property("dc:created").unwrap().time().unwrap().unwrap();
    assert_eq!(created.to_utc().to_rfc3339(), "2023-05-12T07:30:11.123+00:00");

    assert_eq!(doc.property("uid:major_version").unwrap().int().unwrap(), Some(1));
    assert!(doc.property("common:size").unwrap().is_null());
    assert!(doc.context_parameter("breadcrumb").is_some());
}

#[test]
fn test_paginated_users() {
    let body = r#"{
        "entity-type": "users",
        "isPaginable": true,
        "resultsCount": 3,
        "pageSize": 2,
        "currentPageSize": 1,
        "currentPageIndex": 1,
        "numberOfPages": 2,
        "isNextPageAvailable": false,
        "entries": [
            { "entity-type": "user", "id": "jsmith", "properties": { "email": "js@example.com" } }
        ]
    }"#;
    let Entity::Users(users) = Entity::from_slice(body.as_bytes()).unwrap() else {
        panic!("expected users");
    };
    assert!(users.is_consistent());
    assert_eq!(users.entries[0].email().as_deref(), Some("js@example.com"));
}

#[test]
fn test_inconsistent_page_is_detected() {
    let body = r#"{
        "entity-type": "documents",
        "isPaginable": true,
        "resultsCount": 10,
        "pageSize": 5,
        "currentPageSize": 3,
        "currentPageIndex": 0,
        "numberOfPages": 2,
        "isNextPageAvailable": true,
        "entries": []
    }"#;
    let Entity::Documents(docs) = Entity::from_slice(body.as_bytes()).unwrap() else {
        panic!("expected documents");
    };
    assert!(!docs.is_consistent());
}

#[test]
fn test_unknown_entity_is_kept_raw() {
    let body = r#"{ "entity-type": "thumbnail", "url": "http://x/thumb.png" }"#;
    match Entity::from_slice(body.as_bytes()).unwrap() {
        Entity::Other { entity_type, body } => {
            assert_eq!(entity_type, "thumbnail");
            assert!(body.as_json().contains("thumb.png"));
        }
        other => panic!("unexpected entity {}", other.entity_type()),
    }
}

#[test]
fn test_missing_discriminator_is_rejected() {
    assert!(Entity::from_slice(br#"{ "uid": "x" }"#).is_err());
    assert!(Entity::from_slice(b"not json").is_err());
}

#[test]
fn test_string_list_field() {
    let field = Field::from(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(field.as_json(), r#"["a","b"]"#);
    assert_eq!(Field::null().kind(), FieldKind::Null);
}
