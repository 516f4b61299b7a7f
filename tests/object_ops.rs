//! Integration tests for object operations using wiremock.

use rs_tos::TosClient;
use rs_tos::config::ClientBuilder;
use rs_tos::types::common::{BucketName, ObjectKey};
use rs_tos::types::request::{
    DeleteObjectRequestBuilder, GetObjectRequestBuilder, HeadObjectRequestBuilder,
    PutObjectRequestBuilder,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create an `TosClient` that points at the given mock server.
fn mock_client(server: &MockServer) -> TosClient {
    TosClient::from_builder(
        ClientBuilder::new()
            .access_key_id("test-key-id")
            .access_key_secret("test-key-secret")
            .region("cn-beijing")
            .endpoint(server.uri())
            .allow_insecure(true)
            .max_retries(0),
    )
    .unwrap()
}

// ---- PutObject ----

#[tokio::test]
async fn put_object_returns_etag_and_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/hello.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"abc123\"")
                .insert_header("x-tos-request-id", "REQ-001"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = PutObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("hello.txt").unwrap())
        .body(b"Hello, TOS!".to_vec())
        .content_type("text/plain")
        .build()
        .unwrap();

    let response = client.put_object(request).await.unwrap();
    assert_eq!(response.etag, "abc123");
    assert_eq!(response.request_id.as_deref(), Some("REQ-001"));
}

#[tokio::test]
async fn put_object_with_metadata_sends_request() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"meta-etag\"")
                .insert_header("x-tos-request-id", "REQ-META"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = PutObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("doc.pdf").unwrap())
        .body(b"PDF content".to_vec())
        .content_type("application/pdf")
        .metadata("author", "alice")
        .build()
        .unwrap();

    let response = client.put_object(request).await.unwrap();
    assert_eq!(response.etag, "meta-etag");
}

// ---- GetObject ----

#[tokio::test]
async fn get_object_returns_body_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hello.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .insert_header("content-length", "11")
                .insert_header("etag", "\"get-etag\"")
                .set_body_bytes(b"Hello World"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = GetObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("hello.txt").unwrap())
        .build()
        .unwrap();

    let response = client.get_object(request).await.unwrap();
    assert_eq!(response.content_type.as_deref(), Some("text/plain"));
    assert_eq!(response.content_length, Some(11));
    assert_eq!(response.etag.as_deref(), Some("get-etag"));

    let body = response.body.bytes().await.unwrap();
    assert_eq!(&body[..], b"Hello World");
}

#[tokio::test]
async fn get_object_with_range_sends_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big-file.bin"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "application/octet-stream")
                .insert_header("content-length", "100")
                .set_body_bytes(vec![0u8; 100]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = GetObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("big-file.bin").unwrap())
        .range("bytes=0-99")
        .build()
        .unwrap();

    let response = client.get_object(request).await.unwrap();
    assert_eq!(response.content_length, Some(100));
}

#[tokio::test]
async fn get_object_with_version_id_sends_query_param_and_parses_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/versioned.txt"))
        .and(query_param("versionId", "100001"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1-etag\"")
                .insert_header("x-tos-version-id", "100001")
                .set_body_bytes(b"v1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = GetObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("versioned.txt").unwrap())
        .version_id("100001")
        .build()
        .unwrap();

    let response = client.get_object(request).await.unwrap();
    assert_eq!(response.version_id.as_deref(), Some("100001"));
}

// ---- DeleteObject ----

#[tokio::test]
async fn delete_object_returns_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/old-file.txt"))
        .respond_with(ResponseTemplate::new(204).insert_header("x-tos-request-id", "DEL-001"))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = DeleteObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("old-file.txt").unwrap())
        .build()
        .unwrap();

    let response = client.delete_object(request).await.unwrap();
    assert_eq!(response.request_id.as_deref(), Some("DEL-001"));
}

// ---- HeadObject ----

#[tokio::test]
async fn head_object_returns_headers_and_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/info.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .insert_header("content-length", "42")
                .insert_header("etag", "\"head-etag\"")
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT")
                .insert_header("x-tos-meta-author", "bob")
                .insert_header("x-tos-meta-project", "demo"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = HeadObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("info.txt").unwrap())
        .build()
        .unwrap();

    let response = client.head_object(request).await.unwrap();
    assert_eq!(response.content_type.as_deref(), Some("text/plain"));
    assert_eq!(response.content_length, Some(42));
    assert_eq!(response.etag.as_deref(), Some("head-etag"));
    assert!(response.last_modified.is_some());
    assert_eq!(
        response.metadata.get("author").map(|s| s.as_str()),
        Some("bob")
    );
    assert_eq!(
        response.metadata.get("project").map(|s| s.as_str()),
        Some("demo")
    );
}

#[tokio::test]
async fn head_object_with_version_id_sends_query_param() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/info.txt"))
        .and(query_param("versionId", "100001"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "42")
                .insert_header("etag", "\"head-etag\"")
                .insert_header("x-tos-version-id", "100001"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = HeadObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("info.txt").unwrap())
        .version_id("100001")
        .build()
        .unwrap();

    let response = client.head_object(request).await.unwrap();
    assert_eq!(response.version_id.as_deref(), Some("100001"));
}

// ---- Error handling ----

#[tokio::test]
async fn server_error_404_returns_oss_error() {
    let server = MockServer::start().await;

    let error_xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>NoSuchKey</Code>
    <Message>The specified key does not exist.</Message>
    <RequestId>ERR-404-REQ</RequestId>
    <HostId>my-bucket.tos-cn-beijing.volces.com</HostId>
</Error>"#;

    Mock::given(method("GET"))
        .and(path("/missing.txt"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "application/xml")
                .set_body_string(error_xml),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = GetObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("missing.txt").unwrap())
        .build()
        .unwrap();

    let err = client.get_object(request).await.unwrap_err();
    let err_str = err.to_string();
    assert!(err_str.contains("NoSuchKey"), "error: {err_str}");
    assert!(
        err_str.contains("The specified key does not exist"),
        "error: {err_str}"
    );
}

#[tokio::test]
async fn server_error_403_returns_access_denied() {
    let server = MockServer::start().await;

    let error_xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>AccessDenied</Code>
    <Message>You have no right to access this object.</Message>
    <RequestId>ERR-403-REQ</RequestId>
    <HostId>bucket.tos-cn-beijing.volces.com</HostId>
</Error>"#;

    Mock::given(method("PUT"))
        .and(path("/protected.txt"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("content-type", "application/xml")
                .set_body_string(error_xml),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = PutObjectRequestBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("protected.txt").unwrap())
        .body(b"data".to_vec())
        .build()
        .unwrap();

    let err = client.put_object(request).await.unwrap_err();
    let err_str = err.to_string();
    assert!(err_str.contains("AccessDenied"), "error: {err_str}");
}
