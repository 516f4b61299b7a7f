//! Resumable, checkpointed, concurrent object download.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::checkpoint::{Checkpoint, CheckpointLocation, CheckpointStore, FileInfo, ObjectInfo, PartRecord};
use crate::client::TosClient;
use crate::crc64;
use crate::error::{Result, TosError};
use crate::file_backend::{FileBackend, TokioFileBackend};
use crate::partition::{DEFAULT_PART_SIZE, PartPlanner};
use crate::rate_limiter::RateLimiter;
use crate::transfer::cancel::TransferCancellation;
use crate::transfer::events::{
    DataTransferEvent, DataTransferStatus, DownloadEvent, NoopTransferEventListener,
    TransferEventListener,
};
use crate::transfer::scheduler::Scheduler;
use crate::types::common::{BucketName, ObjectKey};
use crate::types::request::{GetObjectRequestBuilder, HeadObjectRequestBuilder};

/// Default number of parts downloaded concurrently.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Caller-supplied replacement for the final temp-file-to-destination rename.
///
/// Receives the temp file path and the intended destination path; must leave
/// the destination in place on success (whether by renaming, copying, or any
/// other mechanism the caller prefers).
pub type RenameFileFn = dyn Fn(&Path, &Path) -> Result<()> + Send + Sync;

/// Input to [`download_file`].
pub struct DownloadInput {
    bucket: BucketName,
    key: ObjectKey,
    version_id: Option<String>,
    file_path: PathBuf,
    part_size: u64,
    task_num: usize,
    checkpoint: CheckpointLocation,
    enable_crc64: bool,
    traffic_limit: Option<u64>,
    rate_limiter: Option<RateLimiter>,
    listener: Arc<dyn TransferEventListener>,
    cancellation: TransferCancellation,
    custom_renamer: Option<Arc<RenameFileFn>>,
}

/// Builder for [`DownloadInput`].
pub struct DownloadInputBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    version_id: Option<String>,
    file_path: Option<PathBuf>,
    part_size: u64,
    task_num: usize,
    checkpoint: CheckpointLocation,
    enable_crc64: bool,
    traffic_limit: Option<u64>,
    rate_limiter: Option<RateLimiter>,
    listener: Arc<dyn TransferEventListener>,
    cancellation: TransferCancellation,
    custom_renamer: Option<Arc<RenameFileFn>>,
}

impl Default for DownloadInputBuilder {
    fn default() -> Self {
        Self {
            bucket: None,
            key: None,
            version_id: None,
            file_path: None,
            part_size: DEFAULT_PART_SIZE,
            task_num: DEFAULT_CONCURRENCY,
            checkpoint: CheckpointLocation::None,
            enable_crc64: true,
            traffic_limit: None,
            rate_limiter: None,
            listener: Arc::new(NoopTransferEventListener),
            cancellation: TransferCancellation::new(),
            custom_renamer: None,
        }
    }
}

impl DownloadInputBuilder {
    /// Create a new builder with the default part size, concurrency, and no checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the source object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Pin the download to a specific object version instead of the current one.
    ///
    /// A checkpoint loaded for resume is discarded if its recorded version ID
    /// doesn't match, the same way an ETag mismatch discards it.
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Set the destination file path.
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the part size in bytes (default 20 MiB).
    pub fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set the number of parts downloaded concurrently (clamped to at least 1).
    pub fn task_num(mut self, task_num: usize) -> Self {
        self.task_num = task_num.max(1);
        self
    }

    /// Set where to read/write the resume checkpoint.
    pub fn checkpoint(mut self, checkpoint: CheckpointLocation) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Whether to verify the whole-object CRC64 after all parts complete (default true).
    pub fn enable_crc64(mut self, enable: bool) -> Self {
        self.enable_crc64 = enable;
        self
    }

    /// Ask the server to cap its send rate for this download, in bytes per second.
    pub fn traffic_limit(mut self, bytes_per_sec: u64) -> Self {
        self.traffic_limit = Some(bytes_per_sec);
        self
    }

    /// Cap the client's own receive rate with a local token bucket.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Set the progress/event observer.
    pub fn event_listener(mut self, listener: Arc<dyn TransferEventListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Set the cancellation handle.
    pub fn cancellation(mut self, cancellation: TransferCancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Replace the final temp-file-to-destination rename with a caller-supplied function.
    ///
    /// Useful when the destination needs to go through something other than
    /// a plain filesystem rename (a different filesystem, an archival move).
    pub fn custom_rename_file_after_download_completed(
        mut self,
        renamer: impl Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.custom_renamer = Some(Arc::new(renamer));
        self
    }

    /// Build the input, defaulting an unset part size to 20 MiB.
    pub fn build(self) -> Result<DownloadInput> {
        Ok(DownloadInput {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            version_id: self.version_id,
            file_path: self
                .file_path
                .ok_or_else(|| TosError::MissingField("file_path".into()))?,
            part_size: if self.part_size == 0 {
                DEFAULT_PART_SIZE
            } else {
                self.part_size
            },
            task_num: self.task_num.max(1),
            checkpoint: self.checkpoint,
            enable_crc64: self.enable_crc64,
            traffic_limit: self.traffic_limit,
            rate_limiter: self.rate_limiter,
            listener: self.listener,
            cancellation: self.cancellation,
            custom_renamer: self.custom_renamer,
        })
    }
}

/// Result of a successful [`download_file`] call.
#[derive(Debug, Clone)]
pub struct DownloadOutput {
    /// ETag of the downloaded object.
    pub etag: String,
    /// Size of the downloaded object, in bytes.
    pub object_size: u64,
    /// Whole-object CRC64, when the server provided one.
    pub hash_crc64ecma: Option<String>,
}

/// Classify a part-level failure as retryable-but-exhausted or terminal.
///
/// The client's own retry middleware has already exhausted retries for
/// transient errors by the time this is called; the distinction here is only
/// about which [`DownloadEvent`] to report and whether a caller should
/// consider resuming worthwhile.
fn classify_part_error(part_number: u32, err: TosError) -> TosError {
    match &err {
        TosError::ServerError { status, .. } if matches!(status, 403 | 404 | 405) => {
            TosError::AbortPart {
                part_number,
                status: *status,
                message: err.to_string(),
            }
        }
        _ => TosError::TransientPart {
            part_number,
            source: Box::new(err),
        },
    }
}

/// Download an object to `input.file_path`, resuming from a checkpoint if one
/// exists and still matches the remote object.
pub async fn download_file(client: &TosClient, input: DownloadInput) -> Result<DownloadOutput> {
    download_file_with_backend(client, input, TokioFileBackend).await
}

async fn download_file_with_backend<B: FileBackend + Clone>(
    client: &TosClient,
    input: DownloadInput,
    backend: B,
) -> Result<DownloadOutput> {
    input.cancellation.check()?;

    let mut head_req = HeadObjectRequestBuilder::new()
        .bucket(input.bucket.clone())
        .key(input.key.clone());
    if let Some(ref v) = input.version_id {
        head_req = head_req.version_id(v.clone());
    }
    let head = client.head_object(head_req.build()?).await?;
    let etag = head
        .etag
        .clone()
        .ok_or_else(|| TosError::CheckpointInvalidated("object response has no ETag".into()))?;
    let object_size = if head.object_type.as_deref() == Some("Symlink") {
        head.symlink_target_size
            .ok_or_else(|| TosError::MissingField("x-tos-symlink-target-size".into()))?
    } else {
        head.content_length
            .ok_or_else(|| TosError::MissingField("content-length".into()))?
    };
    let last_modified = head
        .last_modified
        .ok_or_else(|| TosError::MissingField("last-modified".into()))?;
    let object_info = ObjectInfo {
        etag: etag.clone(),
        hash_crc64ecma: head.hash_crc64ecma.clone(),
        object_size,
        last_modified,
    };

    let store = CheckpointStore::new(backend.clone());
    let cp_path = store
        .resolve_download_path(
            &input.checkpoint,
            input.bucket.as_ref(),
            input.key.as_ref(),
            input.version_id.as_deref(),
        )
        .await;

    let temp_file_path = cp_path
        .as_ref()
        .map(|p| p.with_extension("tmp"))
        .unwrap_or_else(|| {
            let mut p = input.file_path.clone().into_os_string();
            p.push(".tmp");
            PathBuf::from(p)
        });

    let loaded = if let Some(ref path) = cp_path {
        store.load(path).await.ok().flatten()
    } else {
        None
    };
    let mut resumable = loaded.and_then(|cp| cp.validate_against(&object_info, input.part_size).ok().map(|_| cp));
    if let Some(ref cp) = resumable {
        let recorded_temp = cp.file_info.as_ref().map(|f| PathBuf::from(&f.temp_file_path));
        let still_present = match recorded_temp {
            Some(ref p) => backend.exists(p).await.unwrap_or(false),
            None => false,
        };
        if !still_present {
            tracing::warn!("checkpoint's temp file is missing on disk; discarding checkpoint");
            resumable = None;
        }
    }
    let is_fresh_start = resumable.is_none();

    let checkpoint = match resumable {
        Some(cp) => cp,
        None => {
            let parts = PartPlanner::plan(object_size, input.part_size)?;
            let parts_info = parts
                .iter()
                .map(|p| PartRecord {
                    part_number: p.part_number,
                    range_start: p.offset,
                    range_end: p.offset + p.length.saturating_sub(1),
                    length: p.length,
                    hash_crc64ecma: None,
                    etag: None,
                    is_completed: false,
                })
                .collect();
            Checkpoint {
                bucket: input.bucket.as_ref().to_string(),
                key: input.key.as_ref().to_string(),
                version_id: input.version_id.clone(),
                part_size: input.part_size,
                object_info: object_info.clone(),
                file_info: Some(FileInfo {
                    file_path: input.file_path.display().to_string(),
                    temp_file_path: temp_file_path.display().to_string(),
                }),
                upload_id: None,
                parts_info,
            }
        }
    };
    let temp_file_path = checkpoint
        .file_info
        .as_ref()
        .map(|f| PathBuf::from(&f.temp_file_path))
        .unwrap_or(temp_file_path);

    match backend.preallocate(&temp_file_path, object_size).await {
        Ok(()) => input.listener.on_download_event(&DownloadEvent::CreateTempFileSucceed),
        Err(e) => {
            input
                .listener
                .on_download_event(&DownloadEvent::CreateTempFileFailed(e.to_string()));
            return Err(e);
        }
    }

    let checkpoint = Arc::new(tokio::sync::Mutex::new(checkpoint));
    let bytes_done = Arc::new(AtomicU64::new({
        let cp = checkpoint.lock().await;
        cp.bytes_completed()
    }));

    if is_fresh_start {
        input.listener.on_data_transfer_status_change(&DataTransferEvent {
            status: DataTransferStatus::Started,
            rw_once_bytes: 0,
            bytes_transferred: bytes_done.load(Ordering::SeqCst),
            total_bytes: Some(object_size),
        });
    }
    input.listener.on_progress(0.0);

    let pending: Vec<PartRecord> = {
        let cp = checkpoint.lock().await;
        cp.parts_info.iter().filter(|p| !p.is_completed).cloned().collect()
    };

    let client = client.clone();
    let backend_for_workers = backend.clone();
    let store = Arc::new(store);
    let scheduler = Scheduler::new(input.task_num);
    let run_result = scheduler
        .run(pending, input.cancellation.clone(), {
            let checkpoint = checkpoint.clone();
            let store = store.clone();
            let listener = input.listener.clone();
            let bucket = input.bucket.clone();
            let key = input.key.clone();
            let version_id = input.version_id.clone();
            let etag = etag.clone();
            let traffic_limit = input.traffic_limit;
            let rate_limiter = input.rate_limiter.clone();
            let enable_crc64 = input.enable_crc64;
            let bytes_done = bytes_done.clone();
            let backend = backend_for_workers;
            let temp_file_path = temp_file_path.clone();
            let client = client.clone();
            move |part: PartRecord| {
                let checkpoint = checkpoint.clone();
                let store = store.clone();
                let listener = listener.clone();
                let bucket = bucket.clone();
                let key = key.clone();
                let version_id = version_id.clone();
                let etag = etag.clone();
                let rate_limiter = rate_limiter.clone();
                let bytes_done = bytes_done.clone();
                let backend = backend.clone();
                let temp_file_path = temp_file_path.clone();
                let client = client.clone();
                async move {
                    if part.length == 0 {
                        let mut cp = checkpoint.lock().await;
                        if let Some(record) = cp
                            .parts_info
                            .iter_mut()
                            .find(|p| p.part_number == part.part_number)
                        {
                            record.is_completed = true;
                            record.hash_crc64ecma = Some("0".to_string());
                        }
                        store.persist(&cp).await?;
                        drop(cp);
                        listener.on_download_event(&DownloadEvent::DownloadPartSucceed {
                            part_number: part.part_number,
                        });
                        return Ok(());
                    }

                    let length = part.length;
                    let mut req = GetObjectRequestBuilder::new()
                        .bucket(bucket)
                        .key(key)
                        .range(format!("bytes={}-{}", part.range_start, part.range_end))
                        .if_match(etag);
                    if let Some(v) = version_id {
                        req = req.version_id(v);
                    }
                    if let Some(limit) = traffic_limit {
                        req = req.traffic_limit(limit);
                    }
                    let req = req.build()?;

                    let result: Result<()> = async {
                        if let Some(ref limiter) = rate_limiter {
                            limiter.acquire(length).await;
                        }
                        let response = client.get_object(req).await?;
                        let bytes = response
                            .body
                            .bytes()
                            .await
                            .map_err(TosError::Http)?;
                        if bytes.len() as u64 != length {
                            return Err(TosError::CheckpointInvalidated(format!(
                                "part {} expected {} bytes, server returned {}",
                                part.part_number,
                                length,
                                bytes.len()
                            )));
                        }
                        backend.write_at(&temp_file_path, part.range_start, &bytes).await?;
                        let crc = if enable_crc64 {
                            Some(crc64::checksum(&bytes).to_string())
                        } else {
                            None
                        };

                        let mut cp = checkpoint.lock().await;
                        if let Some(record) = cp
                            .parts_info
                            .iter_mut()
                            .find(|p| p.part_number == part.part_number)
                        {
                            record.is_completed = true;
                            record.hash_crc64ecma = crc;
                        }
                        store.persist(&cp).await?;
                        drop(cp);

                        let total_done = bytes_done.fetch_add(length, Ordering::SeqCst) + length;
                        if total_done < object_size {
                            listener.on_progress(total_done as f64 / object_size.max(1) as f64);
                        }
                        listener.on_data_transfer_status_change(&DataTransferEvent {
                            status: DataTransferStatus::Rw,
                            rw_once_bytes: length,
                            bytes_transferred: total_done,
                            total_bytes: Some(object_size),
                        });
                        Ok(())
                    }
                    .await;

                    match result {
                        Ok(()) => {
                            listener.on_download_event(&DownloadEvent::DownloadPartSucceed {
                                part_number: part.part_number,
                            });
                            Ok(())
                        }
                        Err(e) => {
                            let wrapped = classify_part_error(part.part_number, e);
                            match &wrapped {
                                TosError::AbortPart { message, .. } => {
                                    listener.on_download_event(&DownloadEvent::DownloadPartAborted {
                                        part_number: part.part_number,
                                        message: message.clone(),
                                    });
                                }
                                _ => {
                                    listener.on_download_event(&DownloadEvent::DownloadPartFailed {
                                        part_number: part.part_number,
                                        message: wrapped.to_string(),
                                    });
                                }
                            }
                            Err(wrapped)
                        }
                    }
                }
            }
        })
        .await;

    if let Err(e) = run_result {
        input.listener.on_data_transfer_status_change(&DataTransferEvent {
            status: DataTransferStatus::Failed,
            rw_once_bytes: 0,
            bytes_transferred: bytes_done.load(Ordering::SeqCst),
            total_bytes: Some(object_size),
        });
        return Err(e);
    }

    // VERIFY
    if input.enable_crc64
        && let Some(ref expected) = object_info.hash_crc64ecma
    {
        let cp = checkpoint.lock().await;
        let mut parts: Vec<&PartRecord> = cp.parts_info.iter().collect();
        parts.sort_by_key(|p| p.part_number);
        let combined = crc64::combine_many(
            parts
                .iter()
                .map(|p| (p.hash_crc64ecma.as_deref().unwrap_or("0"), p.length)),
        )?;
        drop(cp);
        if &combined != expected {
            input.listener.on_data_transfer_status_change(&DataTransferEvent {
                status: DataTransferStatus::Failed,
                rw_once_bytes: 0,
                bytes_transferred: object_size,
                total_bytes: Some(object_size),
            });
            return Err(TosError::CrcMismatch {
                computed: combined,
                expected: expected.clone(),
            });
        }
    }

    // FINALIZE
    let rename_result = match input.custom_renamer {
        Some(ref renamer) => renamer(&temp_file_path, &input.file_path),
        None => backend.rename(&temp_file_path, &input.file_path).await,
    };
    match rename_result {
        Ok(()) => input.listener.on_download_event(&DownloadEvent::RenameTempFileSucceed),
        Err(e) => {
            input
                .listener
                .on_download_event(&DownloadEvent::RenameTempFileFailed(e.to_string()));
            input.listener.on_data_transfer_status_change(&DataTransferEvent {
                status: DataTransferStatus::Failed,
                rw_once_bytes: 0,
                bytes_transferred: bytes_done.load(Ordering::SeqCst),
                total_bytes: Some(object_size),
            });
            return Err(e);
        }
    }

    store.remove().await;

    input.listener.on_progress(1.0);
    input.listener.on_data_transfer_status_change(&DataTransferEvent {
        status: DataTransferStatus::Succeed,
        rw_once_bytes: 0,
        bytes_transferred: object_size,
        total_bytes: Some(object_size),
    });

    Ok(DownloadOutput {
        etag,
        object_size,
        hash_crc64ecma: object_info.hash_crc64ecma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_bucket_key_and_file_path() {
        let err = DownloadInputBuilder::new().build().unwrap_err();
        assert!(matches!(err, TosError::MissingField(_)));
    }

    #[test]
    fn builder_carries_a_custom_renamer() {
        let input = DownloadInputBuilder::new()
            .bucket(BucketName::new("b").unwrap())
            .key(ObjectKey::new("k").unwrap())
            .file_path("/tmp/out.bin")
            .custom_rename_file_after_download_completed(|_from, _to| Ok(()))
            .build()
            .unwrap();
        assert!(input.custom_renamer.is_some());
    }

    #[test]
    fn builder_carries_a_version_id() {
        let input = DownloadInputBuilder::new()
            .bucket(BucketName::new("b").unwrap())
            .key(ObjectKey::new("k").unwrap())
            .file_path("/tmp/out.bin")
            .version_id("100001")
            .build()
            .unwrap();
        assert_eq!(input.version_id.as_deref(), Some("100001"));
    }

    #[test]
    fn builder_defaults_part_size_and_concurrency() {
        let input = DownloadInputBuilder::new()
            .bucket(BucketName::new("b").unwrap())
            .key(ObjectKey::new("k").unwrap())
            .file_path("/tmp/out.bin")
            .build()
            .unwrap();
        assert_eq!(input.part_size, DEFAULT_PART_SIZE);
        assert_eq!(input.task_num, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn builder_zero_part_size_falls_back_to_default() {
        let input = DownloadInputBuilder::new()
            .bucket(BucketName::new("b").unwrap())
            .key(ObjectKey::new("k").unwrap())
            .file_path("/tmp/out.bin")
            .part_size(0)
            .build()
            .unwrap();
        assert_eq!(input.part_size, DEFAULT_PART_SIZE);
    }

    #[test]
    fn builder_clamps_task_num_to_one() {
        let input = DownloadInputBuilder::new()
            .bucket(BucketName::new("b").unwrap())
            .key(ObjectKey::new("k").unwrap())
            .file_path("/tmp/out.bin")
            .task_num(0)
            .build()
            .unwrap();
        assert_eq!(input.task_num, 1);
    }

    #[test]
    fn classify_maps_not_found_to_abort() {
        let err = TosError::ServerError {
            status: 404,
            code: "NoSuchKey".into(),
            message: "missing".into(),
            request_id: String::new(),
            host_id: String::new(),
        };
        let wrapped = classify_part_error(3, err);
        assert!(matches!(wrapped, TosError::AbortPart { part_number: 3, status: 404, .. }));
    }

    #[test]
    fn classify_maps_server_500_to_transient() {
        let err = TosError::ServerError {
            status: 500,
            code: "InternalError".into(),
            message: "oops".into(),
            request_id: String::new(),
            host_id: String::new(),
        };
        let wrapped = classify_part_error(1, err);
        assert!(matches!(wrapped, TosError::TransientPart { part_number: 1, .. }));
    }
}
