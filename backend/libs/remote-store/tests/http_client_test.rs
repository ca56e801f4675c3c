//! HTTP client tests against a mock backend

use remote_store::{
    AccountService, BlobStore, DocumentStore, FileUpload, HttpRemote, Query, RemoteConfig,
    StoreError, CREATED_AT,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_for(server: &MockServer) -> HttpRemote {
    let config = RemoteConfig::new(format!("{}/v1", server.uri()), "proj", "main");
    HttpRemote::new(config).unwrap()
}

fn post_payload(id: &str) -> serde_json::Value {
    json!({
        "$id": id,
        "$createdAt": "2024-03-01T10:00:00.000+00:00",
        "$updatedAt": "2024-03-01T10:00:00.000+00:00",
        "caption": "hello"
    })
}

#[tokio::test]
async fn list_documents_sends_each_query_as_json_param() {
    let server = MockServer::start().await;
    let order = Query::order_desc(CREATED_AT).to_json();
    let limit = Query::limit(9).to_json();
    let cursor = Query::cursor_after("post-3").to_json();

    Mock::given(method("GET"))
        .and(path("/v1/databases/main/collections/posts/documents"))
        .and(header("X-Appwrite-Project", "proj"))
        .and(query_param("queries[]", order.as_str()))
        .and(query_param("queries[]", limit.as_str()))
        .and(query_param("queries[]", cursor.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "documents": [post_payload("post-2")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = remote_for(&server)
        .list_documents(
            "posts",
            &[
                Query::order_desc(CREATED_AT),
                Query::limit(9),
                Query::cursor_after("post-3"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(list.total, 1);
    assert_eq!(list.documents[0].id, "post-2");
}

#[tokio::test]
async fn create_document_wraps_fields_with_document_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/main/collections/posts/documents"))
        .and(body_json(json!({
            "documentId": "post-1",
            "data": { "caption": "hello" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(post_payload("post-1")))
        .expect(1)
        .mount(&server)
        .await;

    let doc = remote_for(&server)
        .create_document("posts", "post-1", json!({ "caption": "hello" }))
        .await
        .unwrap();
    assert_eq!(doc.id, "post-1");
}

#[tokio::test]
async fn missing_document_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/databases/main/collections/posts/documents/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Document with the requested ID could not be found.",
            "code": 404,
            "type": "document_not_found"
        })))
        .mount(&server)
        .await;

    let err = remote_for(&server)
        .get_document("posts", "gone")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("could not be found"));
}

#[tokio::test]
async fn server_error_without_body_keeps_status() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/storage/buckets/media/files/f1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = remote_for(&server)
        .delete_file("media", "f1")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Remote { status: 503, .. }));
}

#[tokio::test]
async fn upload_file_posts_multipart_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storage/buckets/media/files"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "file-1",
            "bucketId": "media",
            "name": "cat.png",
            "mimeType": "image/png",
            "sizeOriginal": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stored = remote_for(&server)
        .upload_file(
            "media",
            "file-1",
            FileUpload::new("cat.png", "image/png", vec![1, 2, 3]),
        )
        .await
        .unwrap();

    assert_eq!(stored.id, "file-1");
    assert_eq!(stored.size_original, 3);
}

#[tokio::test]
async fn delete_current_session() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    remote_for(&server).delete_session("current").await.unwrap();
}

#[tokio::test]
async fn get_account_without_session_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "User (role: guests) missing scope (account)",
            "code": 401
        })))
        .mount(&server)
        .await;

    let err = remote_for(&server).get_account().await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
}
