//! Object operation request types: Put, Get, Delete, Head.

use std::collections::HashMap;

use crate::error::{TosError, Result};
use crate::types::common::{BucketName, ObjectAcl, ObjectKey, StorageClass};

use super::validate_metadata_key;

/// Request to upload an object to TOS.
#[derive(Debug)]
pub struct PutObjectRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) body: reqwest::Body,
    pub(crate) content_type: Option<String>,
    pub(crate) storage_class: Option<StorageClass>,
    pub(crate) acl: Option<ObjectAcl>,
    pub(crate) metadata: HashMap<String, String>,
}

/// Builder for [`PutObjectRequest`].
#[derive(Debug, Default)]
pub struct PutObjectRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    body: Option<reqwest::Body>,
    content_type: Option<String>,
    storage_class: Option<StorageClass>,
    acl: Option<ObjectAcl>,
    metadata: HashMap<String, String>,
}

impl PutObjectRequestBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the storage class.
    pub fn storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = Some(storage_class);
        self
    }

    /// Set the object ACL.
    pub fn acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Add a custom metadata entry (x-tos-meta-*).
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<PutObjectRequest> {
        for key in self.metadata.keys() {
            validate_metadata_key(key)?;
        }
        Ok(PutObjectRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            body: self
                .body
                .ok_or_else(|| TosError::MissingField("body".into()))?,
            content_type: self.content_type,
            storage_class: self.storage_class,
            acl: self.acl,
            metadata: self.metadata,
        })
    }
}

/// Request to download an object from TOS.
#[derive(Debug)]
pub struct GetObjectRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) version_id: Option<String>,
    pub(crate) range: Option<String>,
    pub(crate) if_match: Option<String>,
    pub(crate) traffic_limit: Option<u64>,
}

/// Builder for [`GetObjectRequest`].
#[derive(Debug, Default)]
pub struct GetObjectRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    version_id: Option<String>,
    range: Option<String>,
    if_match: Option<String>,
    traffic_limit: Option<u64>,
}

impl GetObjectRequestBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Target a specific object version instead of the current one.
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Set the byte range (e.g., "bytes=0-999").
    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Require the object's current ETag to match before returning data.
    ///
    /// Used by the transfer engine to pin a ranged GET to the exact object
    /// version a checkpoint was taken against.
    pub fn if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Cap server-side send rate for this request, in bytes per second.
    pub fn traffic_limit(mut self, bytes_per_sec: u64) -> Self {
        self.traffic_limit = Some(bytes_per_sec);
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<GetObjectRequest> {
        Ok(GetObjectRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            version_id: self.version_id,
            range: self.range,
            if_match: self.if_match,
            traffic_limit: self.traffic_limit,
        })
    }
}

/// Request to delete an object from TOS.
#[derive(Debug)]
pub struct DeleteObjectRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
}

/// Builder for [`DeleteObjectRequest`].
#[derive(Debug, Default)]
pub struct DeleteObjectRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
}

impl DeleteObjectRequestBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<DeleteObjectRequest> {
        Ok(DeleteObjectRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
        })
    }
}

/// Request to retrieve object metadata from TOS.
#[derive(Debug)]
pub struct HeadObjectRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) version_id: Option<String>,
}

/// Builder for [`HeadObjectRequest`].
#[derive(Debug, Default)]
pub struct HeadObjectRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    version_id: Option<String>,
}

impl HeadObjectRequestBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target bucket.
    pub fn bucket(mut self, bucket: BucketName) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the object key.
    pub fn key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Target a specific object version instead of the current one.
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<HeadObjectRequest> {
        Ok(HeadObjectRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            version_id: self.version_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_object_request_builder() {
        let req = PutObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .body(b"hello".to_vec())
            .content_type("text/plain")
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn put_object_request_missing_bucket() {
        let req = PutObjectRequestBuilder::new()
            .key(ObjectKey::new("test.txt").unwrap())
            .body(b"hello".to_vec())
            .build();
        assert!(req.is_err());
    }

    #[test]
    fn get_object_request_with_range() {
        let req = GetObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .range("bytes=0-999")
            .build();
        assert!(req.is_ok());
        let req = req.unwrap();
        assert_eq!(req.range.as_deref(), Some("bytes=0-999"));
    }

    #[test]
    fn delete_object_request_builder() {
        let req = DeleteObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn head_object_request_builder() {
        let req = HeadObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn put_object_with_metadata() {
        let req = PutObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .body(b"hello".to_vec())
            .metadata("author", "test")
            .metadata("project", "demo")
            .build()
            .unwrap();
        assert_eq!(req.metadata.len(), 2);
        assert_eq!(req.metadata.get("author").unwrap(), "test");
    }

    #[test]
    fn metadata_key_with_spaces_fails() {
        let req = PutObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .body(b"hello".to_vec())
            .metadata("invalid key", "value")
            .build();
        assert!(req.is_err());
    }

    #[test]
    fn metadata_key_valid_passes() {
        let req = PutObjectRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("test.txt").unwrap())
            .body(b"hello".to_vec())
            .metadata("valid-key_1", "value")
            .build();
        assert!(req.is_ok());
    }
}
