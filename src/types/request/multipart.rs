//! Multipart upload request types: Initiate, UploadPart, Complete, Abort.

use serde::Serialize;

use crate::error::{TosError, Result};
use crate::types::common::{BucketName, ObjectKey, StorageClass};

/// Request to initiate a multipart upload.
#[derive(Debug)]
pub struct InitiateMultipartUploadRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) content_type: Option<String>,
    pub(crate) storage_class: Option<StorageClass>,
}

/// Builder for [`InitiateMultipartUploadRequest`].
#[derive(Debug, Default)]
pub struct InitiateMultipartUploadRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    content_type: Option<String>,
    storage_class: Option<StorageClass>,
}

impl InitiateMultipartUploadRequestBuilder {
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

    /// Build the request.
    pub fn build(self) -> Result<InitiateMultipartUploadRequest> {
        Ok(InitiateMultipartUploadRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            content_type: self.content_type,
            storage_class: self.storage_class,
        })
    }
}

/// Request to upload a single part in a multipart upload.
#[derive(Debug)]
pub struct UploadPartRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) upload_id: String,
    pub(crate) part_number: u32,
    pub(crate) body: reqwest::Body,
    pub(crate) traffic_limit: Option<u64>,
}

/// Builder for [`UploadPartRequest`].
#[derive(Debug, Default)]
pub struct UploadPartRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    upload_id: Option<String>,
    part_number: Option<u32>,
    body: Option<reqwest::Body>,
    traffic_limit: Option<u64>,
}

impl UploadPartRequestBuilder {
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

    /// Set the upload ID from InitiateMultipartUpload.
    pub fn upload_id(mut self, upload_id: impl Into<String>) -> Self {
        self.upload_id = Some(upload_id.into());
        self
    }

    /// Set the part number (1-10000).
    pub fn part_number(mut self, part_number: u32) -> Self {
        self.part_number = Some(part_number);
        self
    }

    /// Set the part body.
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Cap server-side receive rate for this request, in bytes per second.
    pub fn traffic_limit(mut self, bytes_per_sec: u64) -> Self {
        self.traffic_limit = Some(bytes_per_sec);
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<UploadPartRequest> {
        let part_number = self
            .part_number
            .ok_or_else(|| TosError::MissingField("part_number".into()))?;
        if !(1..=10000).contains(&part_number) {
            return Err(TosError::InvalidParameter {
                field: "part_number".into(),
                reason: "must be between 1 and 10000".into(),
            });
        }
        Ok(UploadPartRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            upload_id: self
                .upload_id
                .ok_or_else(|| TosError::MissingField("upload_id".into()))?,
            part_number,
            body: self
                .body
                .ok_or_else(|| TosError::MissingField("body".into()))?,
            traffic_limit: self.traffic_limit,
        })
    }
}

/// A completed part reference used when completing a multipart upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "Part")]
pub struct CompletedPart {
    /// The part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// The ETag returned when the part was uploaded.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// Request to complete a multipart upload.
#[derive(Debug)]
pub struct CompleteMultipartUploadRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) upload_id: String,
    pub(crate) parts: Vec<CompletedPart>,
    pub(crate) complete_all: bool,
    pub(crate) callback: Option<String>,
    pub(crate) callback_var: Option<String>,
    pub(crate) forbid_overwrite: bool,
}

/// Builder for [`CompleteMultipartUploadRequest`].
#[derive(Debug, Default)]
pub struct CompleteMultipartUploadRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
    complete_all: bool,
    callback: Option<String>,
    callback_var: Option<String>,
    forbid_overwrite: bool,
}

impl CompleteMultipartUploadRequestBuilder {
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

    /// Set the upload ID.
    pub fn upload_id(mut self, upload_id: impl Into<String>) -> Self {
        self.upload_id = Some(upload_id.into());
        self
    }

    /// Add a completed part.
    pub fn part(mut self, part: CompletedPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Set all completed parts at once.
    pub fn parts(mut self, parts: Vec<CompletedPart>) -> Self {
        self.parts = parts;
        self
    }

    /// Ask the server to assemble the object from every part it already has,
    /// without sending an explicit part list.
    ///
    /// Mutually exclusive with [`Self::part`]/[`Self::parts`].
    pub fn complete_all(mut self, complete_all: bool) -> Self {
        self.complete_all = complete_all;
        self
    }

    /// Set a callback to invoke server-side once the object is assembled.
    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    /// Set callback variables, sent alongside [`Self::callback`].
    pub fn callback_var(mut self, callback_var: impl Into<String>) -> Self {
        self.callback_var = Some(callback_var.into());
        self
    }

    /// Fail the request instead of overwriting an existing object at this key.
    pub fn forbid_overwrite(mut self, forbid_overwrite: bool) -> Self {
        self.forbid_overwrite = forbid_overwrite;
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<CompleteMultipartUploadRequest> {
        if self.complete_all && !self.parts.is_empty() {
            return Err(TosError::ClientUsage(
                "complete_all cannot be combined with an explicit part list".into(),
            ));
        }
        Ok(CompleteMultipartUploadRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            upload_id: self
                .upload_id
                .ok_or_else(|| TosError::MissingField("upload_id".into()))?,
            parts: self.parts,
            complete_all: self.complete_all,
            callback: self.callback,
            callback_var: self.callback_var,
            forbid_overwrite: self.forbid_overwrite,
        })
    }
}

/// Request to abort a multipart upload.
#[derive(Debug)]
pub struct AbortMultipartUploadRequest {
    pub(crate) bucket: BucketName,
    pub(crate) key: ObjectKey,
    pub(crate) upload_id: String,
}

/// Builder for [`AbortMultipartUploadRequest`].
#[derive(Debug, Default)]
pub struct AbortMultipartUploadRequestBuilder {
    bucket: Option<BucketName>,
    key: Option<ObjectKey>,
    upload_id: Option<String>,
}

impl AbortMultipartUploadRequestBuilder {
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

    /// Set the upload ID.
    pub fn upload_id(mut self, upload_id: impl Into<String>) -> Self {
        self.upload_id = Some(upload_id.into());
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<AbortMultipartUploadRequest> {
        Ok(AbortMultipartUploadRequest {
            bucket: self
                .bucket
                .ok_or_else(|| TosError::MissingField("bucket".into()))?,
            key: self
                .key
                .ok_or_else(|| TosError::MissingField("key".into()))?,
            upload_id: self
                .upload_id
                .ok_or_else(|| TosError::MissingField("upload_id".into()))?,
        })
    }
}

/// XML wrapper for serializing the CompleteMultipartUpload body.
#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUploadXml {
    /// The completed parts.
    #[serde(rename = "Part")]
    pub parts: Vec<CompletedPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initiate_multipart_upload_request_builder() {
        let req = InitiateMultipartUploadRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .content_type("application/octet-stream")
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn upload_part_request_builder() {
        let req = UploadPartRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .upload_id("test-upload-id")
            .part_number(1)
            .body(b"part-data".to_vec())
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn upload_part_request_missing_upload_id() {
        let req = UploadPartRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .part_number(1)
            .body(b"part-data".to_vec())
            .build();
        assert!(req.is_err());
    }

    #[test]
    fn complete_multipart_upload_request_builder() {
        let req = CompleteMultipartUploadRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .upload_id("test-upload-id")
            .part(CompletedPart {
                part_number: 1,
                etag: "etag1".to_string(),
            })
            .part(CompletedPart {
                part_number: 2,
                etag: "etag2".to_string(),
            })
            .build();
        assert!(req.is_ok());
        let req = req.unwrap();
        assert_eq!(req.parts.len(), 2);
    }

    #[test]
    fn complete_multipart_upload_complete_all_with_parts_fails() {
        let req = CompleteMultipartUploadRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .upload_id("test-upload-id")
            .complete_all(true)
            .part(CompletedPart {
                part_number: 1,
                etag: "etag1".to_string(),
            })
            .build();
        assert!(matches!(req, Err(TosError::ClientUsage(_))));
    }

    #[test]
    fn complete_multipart_upload_complete_all_alone_ok() {
        let req = CompleteMultipartUploadRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .upload_id("test-upload-id")
            .complete_all(true)
            .forbid_overwrite(true)
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn abort_multipart_upload_request_builder() {
        let req = AbortMultipartUploadRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("large-file.bin").unwrap())
            .upload_id("test-upload-id")
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn completed_part_serializes_to_xml() {
        let parts = vec![
            CompletedPart {
                part_number: 1,
                etag: "\"etag1\"".to_string(),
            },
            CompletedPart {
                part_number: 2,
                etag: "\"etag2\"".to_string(),
            },
        ];
        let wrapper = CompleteMultipartUploadXml { parts };
        let xml = quick_xml::se::to_string(&wrapper).unwrap();
        assert!(xml.contains("<PartNumber>1</PartNumber>"));
        assert!(xml.contains("<PartNumber>2</PartNumber>"));
        assert!(xml.contains("<ETag>\"etag1\"</ETag>"));
    }

    #[test]
    fn upload_part_request_part_number_zero_fails() {
        let req = UploadPartRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("file.bin").unwrap())
            .upload_id("uid")
            .part_number(0)
            .body(b"data".to_vec())
            .build();
        assert!(req.is_err());
    }

    #[test]
    fn upload_part_request_part_number_10001_fails() {
        let req = UploadPartRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("file.bin").unwrap())
            .upload_id("uid")
            .part_number(10001)
            .body(b"data".to_vec())
            .build();
        assert!(req.is_err());
    }

    #[test]
    fn upload_part_request_part_number_10000_ok() {
        let req = UploadPartRequestBuilder::new()
            .bucket(BucketName::new("test-bucket").unwrap())
            .key(ObjectKey::new("file.bin").unwrap())
            .upload_id("uid")
            .part_number(10000)
            .body(b"data".to_vec())
            .build();
        assert!(req.is_ok());
    }
}
