//! Checkpoint persistence for resumable transfers.
//!
//! A checkpoint records enough state about an in-progress upload or download
//! to validate, on resume, that the remote object and local files are still
//! the ones the checkpoint was taken against, and which parts are already
//! done.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Result, TosError};
use crate::file_backend::FileBackend;

/// Identity of the remote object a checkpoint was taken against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectInfo {
    /// ETag at the time the checkpoint was created.
    pub etag: String,
    /// Server-declared whole-object CRC64, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_crc64ecma: Option<String>,
    /// Object size in bytes.
    pub object_size: u64,
    /// Last-modified timestamp at checkpoint time.
    pub last_modified: DateTime<Utc>,
}

/// Local files a download checkpoint tracks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    /// Final destination path.
    pub file_path: String,
    /// Temp file path data is written to until the transfer completes.
    pub temp_file_path: String,
}

/// Per-part progress recorded in a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartRecord {
    /// 1-indexed part number.
    pub part_number: u32,
    /// Inclusive start offset of this part within the object.
    pub range_start: u64,
    /// Inclusive end offset of this part within the object.
    ///
    /// Meaningless (always equal to `range_start`) for the single zero-length
    /// part synthesized for an empty object; `length` is authoritative for
    /// byte accounting, not `range_end - range_start + 1`.
    pub range_end: u64,
    /// Number of bytes this part covers. Zero only for the sole part of a
    /// zero-size object.
    pub length: u64,
    /// CRC64 of this part's bytes, once transferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_crc64ecma: Option<String>,
    /// ETag returned for this part by UploadPart (uploads only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Whether this part has finished transferring and been verified.
    pub is_completed: bool,
}

/// Resumable transfer state, persisted as JSON next to the transfer's files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    /// Bucket the object lives in.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object version ID, when the bucket is versioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Part size used to plan this transfer.
    pub part_size: u64,
    /// Remote object identity this checkpoint is valid against.
    pub object_info: ObjectInfo,
    /// Local files involved, downloads only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    /// Multipart upload ID, uploads only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    /// Per-part progress.
    pub parts_info: Vec<PartRecord>,
}

impl Checkpoint {
    /// True once every planned part has completed.
    pub fn is_done(&self) -> bool {
        self.parts_info.iter().all(|p| p.is_completed)
    }

    /// Bytes confirmed transferred so far, from completed parts only.
    pub fn bytes_completed(&self) -> u64 {
        self.parts_info
            .iter()
            .filter(|p| p.is_completed)
            .map(|p| p.length)
            .sum()
    }

    /// Validate this checkpoint against freshly observed remote object state.
    ///
    /// A checkpoint is invalidated by any mismatch in etag, size, or
    /// last-modified time, or by a part-size change: all of these mean the
    /// remote object (or the plan) has changed since the checkpoint was taken,
    /// and resuming against stale part ranges would corrupt the result.
    pub fn validate_against(&self, current: &ObjectInfo, part_size: u64) -> Result<()> {
        if self.object_info.etag != current.etag {
            return Err(TosError::CheckpointInvalidated(format!(
                "etag changed: checkpoint has {}, remote has {}",
                self.object_info.etag, current.etag
            )));
        }
        if self.object_info.object_size != current.object_size {
            return Err(TosError::CheckpointInvalidated(format!(
                "object size changed: checkpoint has {}, remote has {}",
                self.object_info.object_size, current.object_size
            )));
        }
        if self.object_info.last_modified != current.last_modified {
            return Err(TosError::CheckpointInvalidated(
                "last-modified time changed since checkpoint was taken".into(),
            ));
        }
        if self.part_size != part_size {
            return Err(TosError::CheckpointInvalidated(format!(
                "part size changed: checkpoint has {}, request has {part_size}",
                self.part_size
            )));
        }
        Ok(())
    }
}

/// Where a transfer should look for, and write, its checkpoint file.
#[derive(Debug, Clone)]
pub enum CheckpointLocation {
    /// Use this exact path as the checkpoint file.
    File(PathBuf),
    /// Place the checkpoint in this directory, under a name derived from the
    /// bucket, key, and (for uploads) a placeholder substituted with the
    /// upload ID once one is known.
    Directory(PathBuf),
    /// Do not persist a checkpoint; the transfer cannot be resumed if interrupted.
    None,
}

/// Strip path separators from a bucket or key before folding it into a
/// checkpoint filename, so a key like `a/b/c.bin` can't escape the checkpoint
/// directory or collide with an unrelated nested path.
fn sanitize_path_component(s: &str) -> String {
    s.replace(['/', '\\'], "_")
}

/// Default checkpoint filename for a download: `{bucket}_{key}.{versionId}.json`.
fn download_checkpoint_name(bucket: &str, key: &str, version_id: Option<&str>) -> String {
    let bucket = sanitize_path_component(bucket);
    let key = sanitize_path_component(key);
    format!("{bucket}_{key}.{}.json", version_id.unwrap_or(""))
}

/// Default checkpoint filename for an upload: `{bucket}_{key}.{uploadId}`.
///
/// The upload ID is unknown until `CreateMultipartUpload` returns, so this is
/// resolved in two stages: a bucket/key-only placeholder is used to probe for
/// a resumable checkpoint before the upload ID is known, and the final name
/// (with the upload ID filled in) is substituted once it is, per §4.4
/// PREPARE_FILES. The upload ID itself still lives inside the checkpoint body
/// for the probe stage.
fn upload_checkpoint_name(bucket: &str, key: &str, upload_id: Option<&str>) -> String {
    let bucket = sanitize_path_component(bucket);
    let key = sanitize_path_component(key);
    match upload_id {
        Some(id) => format!("{bucket}_{key}.{id}"),
        None => format!("{bucket}_{key}"),
    }
}

/// Loads, validates, and atomically persists [`Checkpoint`]s.
///
/// Persistence is serialized behind an internal mutex: only one writer may
/// be mid-write at a time, matching the single scheduler loop that owns a
/// transfer's checkpoint.
pub struct CheckpointStore<B: FileBackend> {
    backend: B,
    path: Mutex<Option<PathBuf>>,
}

impl<B: FileBackend> CheckpointStore<B> {
    /// Create a store that resolves its path lazily via [`Self::resolve_path`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            path: Mutex::new(None),
        }
    }

    /// Borrow the underlying backend, for callers that also need raw file I/O
    /// (e.g. the download/upload drivers writing part data alongside checkpoints).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compute the concrete checkpoint path for a download, and remember it.
    pub async fn resolve_download_path(
        &self,
        location: &CheckpointLocation,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Option<PathBuf> {
        let path = match location {
            CheckpointLocation::File(p) => Some(p.clone()),
            CheckpointLocation::Directory(dir) => {
                Some(dir.join(download_checkpoint_name(bucket, key, version_id)))
            }
            CheckpointLocation::None => None,
        };
        *self.path.lock().await = path.clone();
        path
    }

    /// Compute the concrete checkpoint path for an upload, and remember it.
    ///
    /// Unlike [`Self::resolve_download_path`]'s download-only counterpart,
    /// this can be called before an upload ID is known (to probe for a
    /// resumable checkpoint) and again afterwards; pass `upload_id` once it
    /// is known to substitute the final name per §4.4 PREPARE_FILES.
    pub async fn resolve_upload_path(
        &self,
        location: &CheckpointLocation,
        bucket: &str,
        key: &str,
        upload_id: Option<&str>,
    ) -> Option<PathBuf> {
        let path = match location {
            CheckpointLocation::File(p) => Some(p.clone()),
            CheckpointLocation::Directory(dir) => {
                Some(dir.join(upload_checkpoint_name(bucket, key, upload_id)))
            }
            CheckpointLocation::None => None,
        };
        *self.path.lock().await = path.clone();
        path
    }

    /// Re-point the store at the final upload checkpoint path once the
    /// upload ID is known, moving any already-written placeholder file.
    ///
    /// Per §4.4 PREPARE_FILES: a directory-mode checkpoint starts under a
    /// bucket/key-only placeholder name (the upload ID isn't known until
    /// `CreateMultipartUpload` returns) and is renamed to its final,
    /// upload-ID-qualified name once that id exists.
    pub async fn finalize_upload_path(
        &self,
        location: &CheckpointLocation,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<Option<PathBuf>> {
        let CheckpointLocation::Directory(_) = location else {
            return Ok(self.path.lock().await.clone());
        };
        let mut guard = self.path.lock().await;
        let Some(old_path) = guard.clone() else {
            return Ok(None);
        };
        let Some(dir) = old_path.parent() else {
            return Ok(Some(old_path));
        };
        let new_path = dir.join(upload_checkpoint_name(bucket, key, Some(upload_id)));
        if new_path != old_path && self.backend.exists(&old_path).await? {
            self.backend.rename(&old_path, &new_path).await?;
        }
        *guard = Some(new_path.clone());
        Ok(Some(new_path))
    }

    /// Load a checkpoint from `path`, if present.
    ///
    /// Returns `Ok(None)` when no file exists at `path`. A file that exists
    /// but fails to parse is a [`TosError::CorruptCheckpoint`], not a missing
    /// checkpoint — callers should treat that as "start over", same as an
    /// explicitly invalidated checkpoint, but the distinction is preserved
    /// for diagnostics.
    pub async fn load(&self, path: &Path) -> Result<Option<Checkpoint>> {
        if !self.backend.exists(path).await? {
            return Ok(None);
        }
        let bytes = self.backend.read(path).await?;
        let checkpoint = serde_json::from_slice(&bytes).map_err(|e| TosError::CorruptCheckpoint {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(checkpoint))
    }

    /// Atomically persist `checkpoint` to the path resolved earlier.
    ///
    /// Serialized by the store's internal mutex so concurrent part
    /// completions never interleave writes.
    pub async fn persist(&self, checkpoint: &Checkpoint) -> Result<()> {
        let guard = self.path.lock().await;
        let Some(path) = guard.as_ref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(checkpoint).map_err(|e| TosError::CorruptCheckpoint {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.backend.write_atomic(path, &bytes).await
    }

    /// Remove the checkpoint file after a successful, verified transfer.
    ///
    /// Best-effort: a failure to delete a finished checkpoint does not fail
    /// the transfer, it just leaves a stale file behind.
    pub async fn remove(&self) {
        let guard = self.path.lock().await;
        if let Some(path) = guard.as_ref()
            && let Err(e) = self.backend.remove_file(path).await
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove completed checkpoint");
        }
    }
}
