//! Filesystem operations the transfer engine needs, behind a trait.
//!
//! Abstracting file I/O lets the scheduler and drivers be tested without
//! touching a real disk, and keeps the durable-write ordering (write, fsync,
//! rename, fsync parent) in one place instead of scattered across callers.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::{Result, TosError};

fn io_err(operation: &str, source: std::io::Error) -> TosError {
    TosError::FileIo {
        operation: operation.to_string(),
        source,
    }
}

/// Filesystem capabilities required by checkpointed transfers.
#[async_trait]
pub trait FileBackend: Send + Sync + 'static {
    /// Whether a file exists at `path`.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read the whole file at `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create all missing parent directories of `path`.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Ensure a file exists at `path`, truncated to `size` bytes if it is
    /// newly created. Used to pre-allocate a download's temp file so that
    /// out-of-order part writes can seek freely.
    async fn preallocate(&self, path: &Path, size: u64) -> Result<()>;

    /// Write `data` at `offset` within the file at `path`. The file must
    /// already exist (see [`Self::preallocate`]).
    async fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> Result<()>;

    /// Read the full contents of a completed part at the given offsets from `path`.
    async fn read_range(&self, path: &Path, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Atomically replace the contents of `path` with `data`.
    ///
    /// Writes to a sibling temp file, fsyncs it, renames over `path`, then
    /// fsyncs the parent directory so the rename itself is durable.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Rename `from` to `to`, replacing any existing file at `to`.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove the file at `path`, ignoring a not-found error.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Size in bytes of the file at `path`.
    async fn file_size(&self, path: &Path) -> Result<u64>;

    /// Last-modified time of the file at `path`, used to invalidate an
    /// upload checkpoint when the source file has changed since it was taken.
    async fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>>;
}

/// [`FileBackend`] implementation backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileBackend;

#[async_trait]
impl FileBackend for TokioFileBackend {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path)
            .await
            .map_err(|e| io_err("stat", e))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| io_err("read", e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err("mkdir_p", e))?;
        }
        Ok(())
    }

    async fn preallocate(&self, path: &Path, size: u64) -> Result<()> {
        self.create_dir_all(path).await?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| io_err("create temp file", e))?;
        file.set_len(size).await.map_err(|e| io_err("preallocate", e))?;
        Ok(())
    }

    async fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| io_err("open for write", e))?;
        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| io_err("seek", e))?;
        file.write_all(data).await.map_err(|e| io_err("write", e))?;
        file.flush().await.map_err(|e| io_err("flush", e))?;
        Ok(())
    }

    async fn read_range(&self, path: &Path, offset: u64, length: u64) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| io_err("open for read", e))?;
        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| io_err("seek", e))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| io_err("read_range", e))?;
        Ok(buf)
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.create_dir_all(path).await?;
        let tmp_path = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("new")
        ));
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| io_err("create checkpoint temp file", e))?;
        file.write_all(data).await.map_err(|e| io_err("write checkpoint", e))?;
        file.sync_all().await.map_err(|e| io_err("fsync checkpoint", e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| io_err("rename checkpoint", e))?;

        if let Some(parent) = path.parent()
            && let Ok(dir) = tokio::fs::File::open(parent).await
        {
            let _ = dir.sync_all().await;
        }
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.create_dir_all(to).await?;
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| io_err("rename", e))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("remove_file", e)),
        }
    }

    async fn file_size(&self, path: &Path) -> Result<u64> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_err("stat", e))?;
        Ok(meta.len())
    }

    async fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_err("stat", e))?;
        let modified = meta.modified().map_err(|e| io_err("mtime", e))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
