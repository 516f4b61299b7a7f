//! Volcengine TOS SDK for Rust.
#![deny(missing_docs)]

pub mod auth;
pub mod checkpoint;
pub mod client;
pub mod config;
pub mod crc64;
pub mod credential;
pub(crate) mod encoding;
pub mod error;
pub mod file_backend;
pub mod middleware;
pub mod ops;
pub mod partition;
pub mod progress;
pub mod rate_limiter;
pub mod transfer;
pub mod types;

pub use checkpoint::CheckpointLocation;
pub use client::TosClient;
pub use config::{ClientBuilder, Config, Credentials, PoolConfig, RetryConfig, TimeoutConfig};
pub use credential::{
    CachingProvider, CredentialProvider, EnvironmentProvider, ProviderChain, StaticProvider,
};
pub use error::{TosError, Result};
pub use file_backend::{FileBackend, TokioFileBackend};
pub use middleware::{Interceptor, InterceptorContext, RequestOutcome};
pub use ops::transfer::{
    TransferManager, TransferManagerBuilder, TransferUploadRequest, TransferUploadRequestBuilder,
    TransferUploadResponse,
};
pub use partition::{MAX_PART_COUNT, PartPlanner, PartTask};
pub use progress::{NoopProgressListener, ProgressListener, TransferKind, TransferProgress};
pub use rate_limiter::RateLimiter;
pub use transfer::{
    DataTransferEvent, DataTransferStatus, DownloadEvent, DownloadInput, DownloadInputBuilder,
    DownloadOutput, NoopTransferEventListener, TransferCancellation, TransferEventListener,
    UploadEvent, UploadInput, UploadInputBuilder, UploadOutput, abort_upload, download_file,
    upload_file,
};
pub use types::common::{
    BucketName, MetadataDirective, ObjectAcl, ObjectKey, Region, StorageClass,
};
pub use types::response::ObjectBody;
