//! Resumable, checkpointed, concurrent object upload.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::checkpoint::{Checkpoint, CheckpointLocation, CheckpointStore, ObjectInfo, PartRecord};
use crate::client::TosClient;
use crate::crc64;
use crate::error::{Result, TosError};
use crate::file_backend::{FileBackend, TokioFileBackend};
use crate::partition::{DEFAULT_PART_SIZE, PartPlanner};
use crate::rate_limiter::RateLimiter;
use crate::transfer::cancel::TransferCancellation;
use crate::transfer::download::DEFAULT_CONCURRENCY;
use crate::transfer::events::{
    DataTransferEvent, DataTransferStatus, NoopTransferEventListener, TransferEventListener,
    UploadEvent,
};
use crate::transfer::scheduler::Scheduler;
use crate::types::common::{BucketName, ObjectKey, StorageClass};
use crate::types::request::{
    AbortMultipartUploadRequestBuilder, CompleteMultipartUploadRequestBuilder,
    CompletedPart, InitiateMultipartUploadRequestBuilder, UploadPartRequestBuilder,
};

/// Input to [`upload_file`].
pub struct UploadInput {
    bucket: BucketName,
    key: ObjectKey,
    file_path: PathBuf,
    content_type: Option<String>,
    storage_class: Option<StorageClass>,
    part_size: u64,
    task_num: usize,
    checkpoint: CheckpointLocation,
    enable_crc64: bool,
    traffic_limit: Option<u64>,
    rate_limiter: Option<RateLimiter>,
    listener: Arc<dyn TransferEventListener>,
    cancellation: TransferCancellation,
}

/// Builder for [`UploadInput`].
pub struct UploadInputBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    file_path: Option<PathBuf>,
    content_type: Option<String>,
    storage_class: Option<StorageClass>,
    part_size: u64,
    task_num: usize,
    checkpoint: CheckpointLocation,
    enable_crc64: bool,
    traffic_limit: Option<u64>,
    rate_limiter: Option<RateLimiter>,
    listener: Arc<dyn TransferEventListener>,
    cancellation: TransferCancellation,
}

impl Default for UploadInputBuilder {
    fn default() -> Self {
        Self {
            bucket: None,
            key: None,
            file_path: None,
            content_type: None,
            storage_class: None,
            part_size: DEFAULT_PART_SIZE,
            task_num: DEFAULT_CONCURRENCY,
            checkpoint: CheckpointLocation::None,
            enable_crc64: true,
            traffic_limit: None,
            rate_limiter: None,
            listener: Arc::new(NoopTransferEventListener),
            cancellation: TransferCancellation::new(),
        }
    }
}

impl UploadInputBuilder {
    /// Create a new builder with the default part size, concurrency, and no checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the destination object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the local file to upload.
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the object's content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the object's storage class.
    pub fn storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = Some(storage_class);
        self
    }

    /// Set the part size in bytes (default 20 MiB).
    pub fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set the number of parts uploaded concurrently (clamped to at least 1).
    pub fn task_num(mut self, task_num: usize) -> Self {
        self.task_num = task_num.max(1);
        self
    }

    /// Set where to read/write the resume checkpoint.
    pub fn checkpoint(mut self, checkpoint: CheckpointLocation) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Whether to compute and combine per-part CRC64 into a whole-object CRC64 (default true).
    pub fn enable_crc64(mut self, enable: bool) -> Self {
        self.enable_crc64 = enable;
        self
    }

    /// Ask the server to cap its receive rate for this upload, in bytes per second.
    pub fn traffic_limit(mut self, bytes_per_sec: u64) -> Self {
        self.traffic_limit = Some(bytes_per_sec);
        self
    }

    /// Cap the client's own send rate with a local token bucket.
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

    /// Build the input, defaulting an unset part size to 20 MiB.
    pub fn build(self) -> Result<UploadInput> {
        Ok(UploadInput {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            file_path: self
                .file_path
                .ok_or_else(|| TosError::MissingField("file_path".into()))?,
            content_type: self.content_type,
            storage_class: self.storage_class,
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
        })
    }
}

/// Result of a successful [`upload_file`] call.
#[derive(Debug, Clone)]
pub struct UploadOutput {
    /// ETag of the completed object.
    pub etag: String,
    /// Upload ID used for the multipart upload.
    pub upload_id: String,
    /// Combined whole-object CRC64, when enabled.
    pub hash_crc64ecma: Option<String>,
}

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

/// Upload `input.file_path` as a multipart upload, resuming from a checkpoint
/// if one exists and still matches the local file.
pub async fn upload_file(client: &TosClient, input: UploadInput) -> Result<UploadOutput> {
    upload_file_with_backend(client, input, TokioFileBackend).await
}

async fn upload_file_with_backend<B: FileBackend + Clone>(
    client: &TosClient,
    input: UploadInput,
    backend: B,
) -> Result<UploadOutput> {
    input.cancellation.check()?;

    let object_size = backend.file_size(&input.file_path).await?;
    let last_modified = backend.modified_at(&input.file_path).await?;
    let local_meta = ObjectInfo {
        etag: String::new(),
        hash_crc64ecma: None,
        object_size,
        last_modified,
    };

    let store = CheckpointStore::new(backend.clone());
    let cp_path = store
        .resolve_upload_path(
            &input.checkpoint,
            input.bucket.as_ref(),
            input.key.as_ref(),
            None,
        )
        .await;

    let loaded = if let Some(ref path) = cp_path {
        store.load(path).await.ok().flatten()
    } else {
        None
    };
    let resumable = loaded.filter(|cp| {
        cp.upload_id.is_some() && cp.validate_against(&local_meta, input.part_size).is_ok()
    });
    let is_fresh_start = resumable.is_none();

    let (upload_id, checkpoint) = match resumable {
        Some(cp) => {
            let upload_id = cp.upload_id.clone().unwrap();
            (upload_id, cp)
        }
        None => {
            let mut init_req = InitiateMultipartUploadRequestBuilder::new()
                .bucket(input.bucket.clone())
                .key(input.key.clone());
            if let Some(ref ct) = input.content_type {
                init_req = init_req.content_type(ct.clone());
            }
            if let Some(sc) = input.storage_class {
                init_req = init_req.storage_class(sc);
            }
            let init = match client.initiate_multipart_upload(init_req.build()?).await {
                Ok(resp) => {
                    input.listener.on_upload_event(&UploadEvent::CreateMultipartUploadSucceed {
                        upload_id: resp.upload_id.clone(),
                    });
                    resp
                }
                Err(e) => {
                    input
                        .listener
                        .on_upload_event(&UploadEvent::CreateMultipartUploadFailed(e.to_string()));
                    return Err(e);
                }
            };

            store
                .finalize_upload_path(
                    &input.checkpoint,
                    input.bucket.as_ref(),
                    input.key.as_ref(),
                    &init.upload_id,
                )
                .await?;

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
            let checkpoint = Checkpoint {
                bucket: input.bucket.as_ref().to_string(),
                key: input.key.as_ref().to_string(),
                version_id: None,
                part_size: input.part_size,
                object_info: local_meta,
                file_info: None,
                upload_id: Some(init.upload_id.clone()),
                parts_info,
            };
            (init.upload_id, checkpoint)
        }
    };

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

    let client_outer = client.clone();
    let store = Arc::new(store);
    let scheduler = Scheduler::new(input.task_num);
    let run_result = scheduler
        .run(pending, input.cancellation.clone(), {
            let checkpoint = checkpoint.clone();
            let store = store.clone();
            let listener = input.listener.clone();
            let bucket = input.bucket.clone();
            let key = input.key.clone();
            let upload_id = upload_id.clone();
            let traffic_limit = input.traffic_limit;
            let rate_limiter = input.rate_limiter.clone();
            let enable_crc64 = input.enable_crc64;
            let bytes_done = bytes_done.clone();
            let backend = backend.clone();
            let file_path = input.file_path.clone();
            let client = client_outer.clone();
            move |part: PartRecord| {
                let checkpoint = checkpoint.clone();
                let store = store.clone();
                let listener = listener.clone();
                let bucket = bucket.clone();
                let key = key.clone();
                let upload_id = upload_id.clone();
                let rate_limiter = rate_limiter.clone();
                let bytes_done = bytes_done.clone();
                let backend = backend.clone();
                let file_path = file_path.clone();
                let client = client.clone();
                async move {
                    let length = part.length;
                    let result: Result<(String, Option<String>)> = async {
                        let bytes = backend.read_range(&file_path, part.range_start, length).await?;
                        if let Some(ref limiter) = rate_limiter {
                            limiter.acquire(bytes.len() as u64).await;
                        }
                        let crc = if enable_crc64 {
                            Some(crc64::checksum(&bytes).to_string())
                        } else {
                            None
                        };

                        let mut req = UploadPartRequestBuilder::new()
                            .bucket(bucket)
                            .key(key)
                            .upload_id(upload_id)
                            .part_number(part.part_number)
                            .body(bytes);
                        if let Some(limit) = traffic_limit {
                            req = req.traffic_limit(limit);
                        }
                        let resp = client.upload_part(req.build()?).await?;
                        Ok((resp.etag, crc))
                    }
                    .await;

                    match result {
                        Ok((etag, crc)) => {
                            let mut cp = checkpoint.lock().await;
                            if let Some(record) = cp
                                .parts_info
                                .iter_mut()
                                .find(|p| p.part_number == part.part_number)
                            {
                                record.is_completed = true;
                                record.hash_crc64ecma = crc;
                                record.etag = Some(etag);
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
                            listener.on_upload_event(&UploadEvent::UploadPartSucceed {
                                part_number: part.part_number,
                            });
                            Ok(())
                        }
                        Err(e) => {
                            let wrapped = classify_part_error(part.part_number, e);
                            match &wrapped {
                                TosError::AbortPart { message, .. } => {
                                    listener.on_upload_event(&UploadEvent::UploadPartAborted {
                                        part_number: part.part_number,
                                        message: message.clone(),
                                    });
                                }
                                _ => {
                                    listener.on_upload_event(&UploadEvent::UploadPartFailed {
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

    let combined_crc = if input.enable_crc64 {
        let cp = checkpoint.lock().await;
        let mut parts: Vec<&PartRecord> = cp.parts_info.iter().collect();
        parts.sort_by_key(|p| p.part_number);
        let combined = crc64::combine_many(
            parts
                .iter()
                .map(|p| (p.hash_crc64ecma.as_deref().unwrap_or("0"), p.length)),
        )?;
        Some(combined)
    } else {
        None
    };

    let completed_parts: Vec<CompletedPart> = {
        let cp = checkpoint.lock().await;
        let mut parts: Vec<&PartRecord> = cp.parts_info.iter().collect();
        parts.sort_by_key(|p| p.part_number);
        parts
            .into_iter()
            .map(|p| CompletedPart {
                part_number: p.part_number,
                etag: p.etag.clone().unwrap_or_default(),
            })
            .collect()
    };

    let complete_req = CompleteMultipartUploadRequestBuilder::new()
        .bucket(input.bucket.clone())
        .key(input.key.clone())
        .upload_id(upload_id.clone())
        .parts(completed_parts)
        .build()?;

    let complete_resp = match client.complete_multipart_upload(complete_req).await {
        Ok(resp) => {
            input
                .listener
                .on_upload_event(&UploadEvent::CompleteMultipartUploadSucceed);
            resp
        }
        Err(e) => {
            input
                .listener
                .on_upload_event(&UploadEvent::CompleteMultipartUploadFailed(e.to_string()));
            input.listener.on_data_transfer_status_change(&DataTransferEvent {
                status: DataTransferStatus::Failed,
                rw_once_bytes: 0,
                bytes_transferred: bytes_done.load(Ordering::SeqCst),
                total_bytes: Some(object_size),
            });
            return Err(e);
        }
    };

    if let (Some(ref expected), Some(ref computed)) = (complete_resp.hash_crc64ecma.as_ref(), combined_crc.as_ref())
        && expected != computed
    {
        input.listener.on_data_transfer_status_change(&DataTransferEvent {
            status: DataTransferStatus::Failed,
            rw_once_bytes: 0,
            bytes_transferred: object_size,
            total_bytes: Some(object_size),
        });
        return Err(TosError::CrcMismatch {
            computed: computed.clone(),
            expected: expected.clone(),
        });
    }

    store.remove().await;
    input.listener.on_progress(1.0);
    input.listener.on_data_transfer_status_change(&DataTransferEvent {
        status: DataTransferStatus::Succeed,
        rw_once_bytes: 0,
        bytes_transferred: object_size,
        total_bytes: Some(object_size),
    });

    Ok(UploadOutput {
        etag: complete_resp.etag,
        upload_id,
        hash_crc64ecma: combined_crc.or(complete_resp.hash_crc64ecma),
    })
}

/// Abort an in-progress multipart upload and discard its checkpoint.
///
/// Use after giving up on a resumable upload (e.g. the local file changed
/// underneath it) so the service does not keep billing for orphaned parts.
pub async fn abort_upload(client: &TosClient, bucket: BucketName, key: ObjectKey, upload_id: String) -> Result<()> {
    client
        .abort_multipart_upload(
            AbortMultipartUploadRequestBuilder::new()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .build()?,
        )
        .await?;
    Ok(())
}
