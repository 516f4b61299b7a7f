//! Resumable, checkpointed, concurrent object transfer.
//!
//! This module implements the higher-level download/upload drivers layered
//! on top of the plain `ops::object`/`ops::multipart` request plumbing: part
//! planning ([`crate::partition`]), checkpoint persistence
//! ([`crate::checkpoint`]), bounded concurrency ([`scheduler`]), cancellation
//! ([`cancel`]), and progress/lifecycle observation ([`events`]).

pub mod cancel;
pub mod download;
pub mod events;
pub mod scheduler;
pub mod upload;

pub use cancel::TransferCancellation;
pub use download::{DownloadInput, DownloadInputBuilder, DownloadOutput, download_file};
pub use events::{
    DataTransferEvent, DataTransferStatus, DownloadEvent, NoopTransferEventListener,
    TransferEventListener, UploadEvent, shared_listener,
};
pub use upload::{UploadInput, UploadInputBuilder, UploadOutput, abort_upload, upload_file};
