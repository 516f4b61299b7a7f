//! Observer contracts for transfer progress and lifecycle events.

use std::sync::Arc;

/// Coarse-grained phase of a single part or whole-object data transfer.
///
/// Exactly one of `Succeed`/`Failed` is reported per transfer, after any
/// number of `Rw` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTransferStatus {
    /// The transfer has begun.
    Started,
    /// Bytes have moved since the last event.
    Rw,
    /// The transfer finished successfully.
    Succeed,
    /// The transfer failed.
    Failed,
}

/// A single data-transfer status change, with byte counters at the time it fired.
#[derive(Debug, Clone, Copy)]
pub struct DataTransferEvent {
    /// The status being reported.
    pub status: DataTransferStatus,
    /// Bytes moved by this event alone; nonzero only on `Rw`.
    ///
    /// Summing this field over every `Rw` event for a transfer equals the
    /// object size.
    pub rw_once_bytes: u64,
    /// Bytes transferred so far for the object as a whole.
    pub bytes_transferred: u64,
    /// Total object size, when known.
    pub total_bytes: Option<u64>,
}

/// Structural events specific to downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// The local temp file was created.
    CreateTempFileSucceed,
    /// The local temp file could not be created.
    CreateTempFileFailed(String),
    /// A part finished downloading and its CRC was verified.
    DownloadPartSucceed {
        /// The part number.
        part_number: u32,
    },
    /// A part failed in a way the scheduler will retry.
    DownloadPartFailed {
        /// The part number.
        part_number: u32,
        /// Failure description.
        message: String,
    },
    /// A part failed in a way the scheduler will not retry.
    DownloadPartAborted {
        /// The part number.
        part_number: u32,
        /// Failure description.
        message: String,
    },
    /// The temp file was renamed to its final destination.
    RenameTempFileSucceed,
    /// The temp file could not be renamed to its final destination.
    RenameTempFileFailed(String),
}

/// Structural events specific to uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A multipart upload was initiated.
    CreateMultipartUploadSucceed {
        /// The upload ID the server assigned.
        upload_id: String,
    },
    /// A multipart upload could not be initiated.
    CreateMultipartUploadFailed(String),
    /// A part finished uploading.
    UploadPartSucceed {
        /// The part number.
        part_number: u32,
    },
    /// A part failed in a way the scheduler will retry.
    UploadPartFailed {
        /// The part number.
        part_number: u32,
        /// Failure description.
        message: String,
    },
    /// A part failed in a way the scheduler will not retry.
    UploadPartAborted {
        /// The part number.
        part_number: u32,
        /// Failure description.
        message: String,
    },
    /// The multipart upload was completed.
    CompleteMultipartUploadSucceed,
    /// The multipart upload could not be completed.
    CompleteMultipartUploadFailed(String),
}

/// Receives progress and lifecycle events from a download or upload.
///
/// All methods have no-op defaults; implement only the ones a caller cares
/// about. `on_progress` reports a monotonically increasing fraction in
/// `[0.0, 1.0]`; the final `1.0` is not reported until after integrity
/// verification and finalization both succeed.
pub trait TransferEventListener: Send + Sync {
    /// Called as the transfer's overall completion fraction increases.
    fn on_progress(&self, _fraction: f64) {}
    /// Called on each data-transfer status change.
    fn on_data_transfer_status_change(&self, _event: &DataTransferEvent) {}
    /// Called on download-specific structural events.
    fn on_download_event(&self, _event: &DownloadEvent) {}
    /// Called on upload-specific structural events.
    fn on_upload_event(&self, _event: &UploadEvent) {}
}

/// A listener that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransferEventListener;

impl TransferEventListener for NoopTransferEventListener {}

/// Wrap a [`TransferEventListener`] in an [`Arc`] for shared ownership.
pub fn shared_listener(listener: impl TransferEventListener + 'static) -> Arc<dyn TransferEventListener> {
    Arc::new(listener)
}
