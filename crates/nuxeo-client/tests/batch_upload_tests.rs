//! Batch upload flows against a mocked Server.

mod common;

use common::{api, client, document, exception, init_tracing};
use nuxeo_client::{Blob, Chunk, ClientError, Operation, UploadOptions};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_chunked_upload_reports_progress() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("upload/")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "batchId": "b1" })))
        .expect(1)
        .mount(&server)
        .await;

    for index in 0..3u64 {
        let uploaded: Vec<String> = (0..=index).map(|i| i.to_string()).collect();
        Mock::given(method("POST"))
            .and(path(api("upload/b1/0")))
            .and(header("X-Upload-Type", "chunked"))
            .and(header("X-Upload-Chunk-Index", index.to_string().as_str()))
            .and(header("X-Upload-Chunk-Count", "3"))
            .and(header("X-File-Name", "big.bin"))
            .and(header("X-File-Size", "30"))
            .respond_with(ResponseTemplate::new(if index == 2 { 201 } else { 202 }).set_body_json(
                json!({
                    "batchId": "b1",
                    "fileIdx": "0",
                    "uploadType": "chunked",
                    "uploadedSize": ((index + 1) * 10).to_string(),
                    "uploadedChunkIds": uploaded,
                    "chunkCount": "3"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;
    }

    let batch = client(&server).batch_upload();
    let info = batch.create().await.unwrap();
    assert_eq!(info.batch_id, "b1");

    let data = vec![7u8; 30];
    let mut last = None;
    for (index, piece) in data.chunks(10).enumerate() {
        let chunk = Chunk::new(index as u64, 3).unwrap();
        let blob = Blob::from_bytes("big.bin", "application/octet-stream", piece.to_vec());
        let upload = batch
            .upload_chunk(
                &info.batch_id,
                "0",
                chunk,
                blob,
                UploadOptions::new().file_size(30),
            )
            .await
            .unwrap();
        assert_eq!(upload.uploaded_chunk_ids.len(), index + 1);
        last = Some(upload);
    }

    let last = last.unwrap();
    assert_eq!(last.uploaded_chunk_ids, vec![0, 1, 2]);
    assert_eq!(last.uploaded_size, Some(30));
    assert!(last.is_complete());

    let received = server.received_requests().await.unwrap();
    let chunk_bodies: Vec<usize> = received
        .iter()
        .filter(|r| r.url.path() == api("upload/b1/0"))
        .map(|r| r.body.len())
        .collect();
    assert_eq!(chunk_bodies, vec![10, 10, 10]);
}

#[tokio::test]
async fn test_normal_upload_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("upload/b2/0")))
        .and(header("X-Upload-Type", "normal"))
        .and(header("X-File-Name", "r%C3%A9sum%C3%A9%20final.txt"))
        .and(header("X-File-Type", "text/plain"))
        .and(header("X-File-Size", "5"))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "batchId": "b2",
            "fileIdx": "0",
            "uploadType": "normal",
            "uploadedSize": "5"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = client(&server)
        .batch_upload()
        .upload(
            "b2",
            "0",
            Blob::from_bytes("résumé final.txt", "text/plain", "hello"),
            UploadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(upload.file_idx.as_deref(), Some("0"));
    assert!(!upload.is_chunked());
    assert!(upload.is_complete());
}

#[tokio::test]
async fn test_chunk_without_file_size_omits_size_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("upload/b6/0")))
        .and(header("X-Upload-Type", "chunked"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "batchId": "b6",
            "fileIdx": "0",
            "uploadType": "chunked",
            "uploadedSize": "10",
            "uploadedChunkIds": ["0"],
            "chunkCount": "3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = client(&server)
        .batch_upload()
        .upload_chunk(
            "b6",
            "0",
            Chunk::new(0, 3).unwrap(),
            Blob::from_bytes("big.bin", "application/octet-stream", vec![1u8; 10]),
            UploadOptions::new(),
        )
        .await
        .unwrap();
    assert!(!upload.is_complete());

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("x-file-size").is_none());
    assert_eq!(
        received[0].headers.get("x-upload-chunk-count").and_then(|v| v.to_str().ok()),
        Some("3")
    );
}

#[tokio::test]
async fn test_fetch_uploads_of_empty_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(api("upload/empty")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("upload/full")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "a.txt", "size": 3, "uploadType": "normal" },
            { "name": "b.txt", "size": "4", "uploadType": "normal" }
        ])))
        .mount(&server)
        .await;

    let batch = client(&server).batch_upload();
    assert!(batch.fetch_uploads("empty").await.unwrap().is_empty());

    let uploads = batch.fetch_uploads("full").await.unwrap();
    let sizes: Vec<Option<u64>> = uploads.iter().map(|u| u.size).collect();
    assert_eq!(sizes, vec![Some(3), Some(4)]);
}

#[tokio::test]
async fn test_cancelled_batch_is_gone() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(api("upload/b3")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("upload/b3/0")))
        .respond_with(ResponseTemplate::new(404).set_body_json(exception(404, "Batch b3 not found")))
        .mount(&server)
        .await;

    let batch = client(&server).batch_upload();
    batch.cancel("b3").await.unwrap();

    let err = batch.fetch_upload("b3", "0").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ClientError::Server { .. }));
}

#[tokio::test]
async fn test_execute_operation_on_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("upload/b4/0/execute/Blob.AttachOnDocument")))
        .and(body_json(json!({
            "params": { "document": "/ws/file" },
            "context": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(document("f1", "/ws/file", "File")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(api("upload/b4/execute/FileManager.Import")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity-type": "documents",
            "entries": [
                { "entity-type": "document", "uid": "x", "path": "/ws/x", "type": "File" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let batch = client(&server).batch_upload();
    let attached = batch
        .execute_one(
            "b4",
            "0",
            Operation::new("Blob.AttachOnDocument")
                .param("document", "/ws/file")
                .input_doc("/ignored"),
        )
        .await
        .unwrap()
        .as_document()
        .unwrap();
    assert_eq!(attached.uid, "f1");

    let imported = batch
        .execute_all("b4", Operation::new("FileManager.Import").context("currentDocument", "/ws"))
        .await
        .unwrap()
        .as_documents()
        .unwrap();
    assert_eq!(imported.len(), 1);
}

#[tokio::test]
async fn test_invalid_chunk_is_rejected_locally() {
    let server = MockServer::start().await;

    let err = client(&server)
        .batch_upload()
        .upload_chunk(
            "b5",
            "0",
            Chunk { index: 4, count: 2 },
            Blob::from_bytes("x", "text/plain", "x"),
            UploadOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Usage(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
