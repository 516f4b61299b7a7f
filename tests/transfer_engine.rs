//! Integration tests for the resumable download/upload transfer engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rs_tos::config::ClientBuilder;
use rs_tos::types::common::{BucketName, ObjectKey};
use rs_tos::{
    DataTransferEvent, DataTransferStatus, DownloadInputBuilder, TosClient, TosError,
    TransferEventListener, download_file,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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

#[derive(Default)]
struct RecordingListener {
    terminal_statuses: std::sync::Mutex<Vec<DataTransferStatus>>,
}

impl TransferEventListener for RecordingListener {
    fn on_data_transfer_status_change(&self, event: &DataTransferEvent) {
        if matches!(event.status, DataTransferStatus::Succeed | DataTransferStatus::Failed) {
            self.terminal_statuses.lock().unwrap().push(event.status);
        }
    }
}

#[tokio::test]
async fn downloads_empty_object() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/empty.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"empty-etag\"")
                .insert_header("content-length", "0")
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT")
                .insert_header("x-tos-hash-crc64ecma", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("empty.bin");

    let input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("empty.bin").unwrap())
        .file_path(&dest)
        .build()
        .unwrap();

    let output = download_file(&client, input).await.unwrap();
    assert_eq!(output.object_size, 0);
    assert!(dest.exists());
    assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), 0);
}

#[tokio::test]
async fn downloads_object_in_multiple_parts_with_concurrency() {
    let server = MockServer::start().await;
    let object_size: u64 = 10 * 1024 * 1024;
    let part_size: u64 = 1024 * 1024;
    let body = vec![0x5Au8; object_size as usize];
    let whole_crc = rs_tos::crc64::checksum(&body).to_string();

    Mock::given(method("HEAD"))
        .and(path("/big.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"big-etag\"")
                .insert_header("content-length", object_size.to_string().as_str())
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT")
                .insert_header("x-tos-hash-crc64ecma", whole_crc.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let part_count = object_size.div_ceil(part_size);
    for i in 0..part_count {
        let start = i * part_size;
        let end = (start + part_size).min(object_size) - 1;
        let range_header = format!("bytes={start}-{end}");
        let chunk = body[start as usize..=end as usize].to_vec();
        Mock::given(method("GET"))
            .and(path("/big.bin"))
            .and(header("range", range_header.as_str()))
            .and(header("if-match", "big-etag"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(chunk))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = mock_client(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("big.bin");

    let listener = Arc::new(RecordingListener::default());
    let input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("big.bin").unwrap())
        .file_path(&dest)
        .part_size(part_size)
        .task_num(10)
        .event_listener(listener.clone())
        .build()
        .unwrap();

    let output = download_file(&client, input).await.unwrap();
    assert_eq!(output.object_size, object_size);
    assert_eq!(output.hash_crc64ecma.as_deref(), Some(whole_crc.as_str()));

    let downloaded = tokio::fs::read(&dest).await.unwrap();
    assert_eq!(downloaded, body);
    assert_eq!(
        listener.terminal_statuses.lock().unwrap().as_slice(),
        &[DataTransferStatus::Succeed]
    );
}

#[tokio::test]
async fn downloads_object_with_odd_sized_final_part() {
    let server = MockServer::start().await;
    let object_size: u64 = 10_000;
    let part_size: u64 = 7177;
    let body: Vec<u8> = (0..object_size).map(|i| (i % 251) as u8).collect();

    Mock::given(method("HEAD"))
        .and(path("/odd.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"odd-etag\"")
                .insert_header("content-length", object_size.to_string().as_str())
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let part_count = object_size.div_ceil(part_size);
    for i in 0..part_count {
        let start = i * part_size;
        let end = (start + part_size).min(object_size) - 1;
        let chunk = body[start as usize..=end as usize].to_vec();
        Mock::given(method("GET"))
            .and(path("/odd.bin"))
            .and(header("range", format!("bytes={start}-{end}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(chunk))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = mock_client(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("odd.bin");

    let input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("odd.bin").unwrap())
        .file_path(&dest)
        .part_size(part_size)
        .task_num(3)
        .build()
        .unwrap();

    download_file(&client, input).await.unwrap();
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
}

#[tokio::test]
async fn pause_and_resume_continues_from_checkpoint() {
    let server = MockServer::start().await;
    let object_size: u64 = 100 * 1024 * 1024;
    let part_size: u64 = 10 * 1024 * 1024;
    let part_count = object_size.div_ceil(part_size);
    let body = vec![0x11u8; object_size as usize];

    Mock::given(method("HEAD"))
        .and(path("/resumable.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"resume-etag\"")
                .insert_header("content-length", object_size.to_string().as_str())
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT"),
        )
        .mount(&server)
        .await;

    for i in 0..part_count {
        let start = i * part_size;
        let end = (start + part_size).min(object_size) - 1;
        let chunk = body[start as usize..=end as usize].to_vec();
        Mock::given(method("GET"))
            .and(path("/resumable.bin"))
            .and(header("range", format!("bytes={start}-{end}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(chunk))
            .mount(&server)
            .await;
    }

    let client = mock_client(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("resumable.bin");
    let checkpoint_dir = dir.path().join("checkpoints");
    tokio::fs::create_dir_all(&checkpoint_dir).await.unwrap();

    // First attempt: cancel partway through so the checkpoint records some,
    // but not all, completed parts.
    let cancellation = rs_tos::TransferCancellation::new();
    let first_run_cancel = cancellation.clone();
    let listener_calls = Arc::new(AtomicUsize::new(0));
    let counting = CancelAfterNListener {
        cancel: first_run_cancel,
        threshold: 4,
        count: listener_calls.clone(),
    };

    let first_input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("resumable.bin").unwrap())
        .file_path(&dest)
        .part_size(part_size)
        .task_num(1)
        .checkpoint(rs_tos::CheckpointLocation::Directory(checkpoint_dir.clone()))
        .event_listener(Arc::new(counting))
        .cancellation(cancellation)
        .build()
        .unwrap();

    let first_result = download_file(&client, first_input).await;
    assert!(matches!(first_result, Err(TosError::Cancelled)));
    assert!(!dest.exists());

    // Second attempt resumes from the checkpoint and finishes.
    let second_input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("resumable.bin").unwrap())
        .file_path(&dest)
        .part_size(part_size)
        .task_num(1)
        .checkpoint(rs_tos::CheckpointLocation::Directory(checkpoint_dir))
        .build()
        .unwrap();

    let output = download_file(&client, second_input).await.unwrap();
    assert_eq!(output.object_size, object_size);
    assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), object_size);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
}

struct CancelAfterNListener {
    cancel: rs_tos::TransferCancellation,
    threshold: usize,
    count: Arc<AtomicUsize>,
}

impl TransferEventListener for CancelAfterNListener {
    fn on_download_event(&self, event: &rs_tos::DownloadEvent) {
        if matches!(event, rs_tos::DownloadEvent::DownloadPartSucceed { .. }) {
            let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.threshold {
                self.cancel.cancel();
            }
        }
    }
}

#[tokio::test]
async fn crc_mismatch_is_reported_and_checkpoint_preserved() {
    let server = MockServer::start().await;
    let object_size: u64 = 16;
    let body = vec![0xAAu8; object_size as usize];

    Mock::given(method("HEAD"))
        .and(path("/corrupt.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"corrupt-etag\"")
                .insert_header("content-length", object_size.to_string().as_str())
                .insert_header("last-modified", "Sat, 01 Jan 2025 00:00:00 GMT")
                .insert_header("x-tos-hash-crc64ecma", "123456789"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/corrupt.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("corrupt.bin");
    let checkpoint_path = dir.path().join("corrupt.checkpoint.json");

    let input = DownloadInputBuilder::new()
        .bucket(BucketName::new("my-bucket").unwrap())
        .key(ObjectKey::new("corrupt.bin").unwrap())
        .file_path(&dest)
        .checkpoint(rs_tos::CheckpointLocation::File(checkpoint_path.clone()))
        .build()
        .unwrap();

    let err = download_file(&client, input).await.unwrap_err();
    assert!(matches!(err, TosError::CrcMismatch { .. }));
    assert!(!dest.exists());
    assert!(checkpoint_path.exists());
}
