//! Error types for the Volcengine TOS SDK.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interacting with Volcengine TOS.
#[derive(Debug, Error)]
pub enum TosError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// TOS service returned an error response.
    #[error("TOS service error (HTTP {status}): {code} - {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// TOS error code.
        code: String,
        /// Human-readable error message.
        message: String,
        /// Request ID for troubleshooting.
        request_id: String,
        /// Host that generated the error.
        host_id: String,
    },

    /// Invalid bucket name.
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Invalid object key.
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),

    /// Invalid region.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// Authentication or signing error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required field in builder.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Operation timed out.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid parameter value.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        /// The parameter name.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// All retry attempts exhausted.
    #[error("retry exhausted after {attempts} attempt(s)")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last error encountered.
        last_error: Box<TosError>,
    },

    /// Invalid URL construction.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid use of the transfer API (bad input combination, malformed checkpoint schema).
    #[error("client usage error: {0}")]
    ClientUsage(String),

    /// A checkpoint file exists but could not be parsed.
    #[error("corrupt checkpoint at {path}: {reason}")]
    CorruptCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Parse failure description.
        reason: String,
    },

    /// A checkpoint no longer matches the object or local state it describes.
    #[error("checkpoint invalidated: {0}")]
    CheckpointInvalidated(String),

    /// A part request failed for a retryable reason (network, 5xx, timeout).
    #[error("transient error on part {part_number}: {source}")]
    TransientPart {
        /// The part number that failed.
        part_number: u32,
        /// The underlying error.
        #[source]
        source: Box<TosError>,
    },

    /// A part request was rejected by the server in a way that should not be retried.
    #[error("part {part_number} aborted (HTTP {status}): {message}")]
    AbortPart {
        /// The part number that failed.
        part_number: u32,
        /// HTTP status code (403, 404, or 405).
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// The combined CRC64 of transferred parts did not match the server's declared value.
    #[error("CRC64 mismatch: computed {computed}, expected {expected}")]
    CrcMismatch {
        /// The locally computed whole-object CRC64.
        computed: String,
        /// The server-declared CRC64.
        expected: String,
    },

    /// The transfer was cancelled by the caller's cancellation token.
    #[error("transfer cancelled")]
    Cancelled,

    /// A local filesystem operation failed during a transfer.
    #[error("file I/O error during {operation}: {source}")]
    FileIo {
        /// The operation being attempted (e.g. "create temp file", "rename").
        operation: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized `Result` type for TOS operations.
pub type Result<T> = std::result::Result<T, TosError>;

/// Raw TOS error response XML structure.
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct TosErrorResponse {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "RequestId")]
    request_id: String,
    #[serde(rename = "HostId", default)]
    host_id: String,
}

impl TosError {
    /// Parse an TOS error response from HTTP status and body.
    ///
    /// Attempts to parse the body as TOS XML error format. Falls back to
    /// a raw message if XML parsing fails.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        match quick_xml::de::from_str::<TosErrorResponse>(body) {
            Ok(err_resp) => TosError::ServerError {
                status: status.as_u16(),
                code: err_resp.code,
                message: err_resp.message,
                request_id: err_resp.request_id,
                host_id: err_resp.host_id,
            },
            Err(_) => TosError::ServerError {
                status: status.as_u16(),
                code: String::new(),
                message: body.to_string(),
                request_id: String::new(),
                host_id: String::new(),
            },
        }
    }
}
