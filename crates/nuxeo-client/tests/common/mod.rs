//! Shared helpers for the integration suites.

#![allow(dead_code)]

use nuxeo_client::{ClientBuilder, NuxeoClient};
use serde_json::{json, Value};
use wiremock::MockServer;

/// Route every suite's logs through the test writer once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("nuxeo_client=debug")
        .with_test_writer()
        .try_init();
}

/// Base URL of the Server mounted on the mock
pub fn server_url(server: &MockServer) -> String {
    format!("{}/nuxeo", server.uri())
}

/// API path on the mock for a REST path
pub fn api(path: &str) -> String {
    format!("/nuxeo/api/v1/{}", path)
}

pub fn builder(server: &MockServer) -> ClientBuilder {
    NuxeoClient::builder().base_url(server_url(server))
}

pub fn client(server: &MockServer) -> NuxeoClient {
    builder(server)
        .basic_auth("Administrator", "Administrator")
        .build()
        .unwrap()
}

pub fn document(uid: &str, path: &str, doc_type: &str) -> Value {
    json!({
        "entity-type": "document",
        "repository": "default",
        "uid": uid,
        "path": path,
        "type": doc_type,
        "state": "project",
        "title": path.rsplit('/').next().unwrap_or_default(),
        "facets": ["Folderish"],
        "properties": {
            "dc:title": path.rsplit('/').next().unwrap_or_default()
        }
    })
}

pub fn documents(entries: Vec<Value>, page_index: i64, page_size: i64, total: i64) -> Value {
    let pages = if page_size > 0 { (total + page_size - 1) / page_size } else { 1 };
    json!({
        "entity-type": "documents",
        "isPaginable": true,
        "resultsCount": total,
        "pageSize": page_size,
        "currentPageSize": entries.len(),
        "currentPageIndex": page_index,
        "numberOfPages": pages,
        "isNextPageAvailable": page_index + 1 < pages,
        "entries": entries
    })
}

pub fn exception(status: u16, message: &str) -> Value {
    json!({
        "entity-type": "exception",
        "status": status,
        "message": message,
        "stacktrace": "org.nuxeo.ecm.core.api.DocumentNotFoundException: ..."
    })
}
