//! Request types and builders for TOS operations.

mod multipart;
mod object;

use crate::error::{TosError, Result};

/// Validate that a metadata key contains only ASCII alphanumeric, hyphens, and underscores.
fn validate_metadata_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TosError::InvalidParameter {
            field: "metadata key".into(),
            reason: "must not be empty".into(),
        });
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(TosError::InvalidParameter {
            field: "metadata key".into(),
            reason: format!(
                "contains invalid characters: '{}'. Only ASCII alphanumeric, hyphens, and underscores are allowed",
                key
            ),
        });
    }
    Ok(())
}

pub use multipart::{
    AbortMultipartUploadRequest, AbortMultipartUploadRequestBuilder,
    CompleteMultipartUploadRequest, CompleteMultipartUploadRequestBuilder,
    CompleteMultipartUploadXml, CompletedPart, InitiateMultipartUploadRequest,
    InitiateMultipartUploadRequestBuilder, UploadPartRequest, UploadPartRequestBuilder,
};
pub use object::{
    DeleteObjectRequest, DeleteObjectRequestBuilder, GetObjectRequest, GetObjectRequestBuilder,
    HeadObjectRequest, HeadObjectRequestBuilder, PutObjectRequest, PutObjectRequestBuilder,
};
