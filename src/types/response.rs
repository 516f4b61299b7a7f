//! Response types for TOS operations.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::StorageClass;

/// Response from a PutObject operation.
#[derive(Debug)]
pub struct PutObjectResponse {
    /// ETag of the uploaded object.
    pub etag: String,
    /// TOS request ID.
    pub request_id: Option<String>,
}

/// A wrapper around the response body that hides the underlying HTTP library.
///
/// Provides methods to consume the body as bytes, text, or a streaming byte stream.
pub struct ObjectBody(reqwest::Response);

impl ObjectBody {
    /// Create a new `ObjectBody` from a `reqwest::Response`.
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self(response)
    }

    /// Consume the body and return all bytes.
    pub async fn bytes(self) -> std::result::Result<bytes::Bytes, reqwest::Error> {
        self.0.bytes().await
    }

    /// Consume the body and return it as a UTF-8 string.
    pub async fn text(self) -> std::result::Result<String, reqwest::Error> {
        self.0.text().await
    }

    /// Return a streaming byte stream for incremental reading.
    pub fn bytes_stream(
        self,
    ) -> impl futures_util::Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> {
        self.0.bytes_stream()
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<streaming body>")
    }
}

/// Response from a GetObject operation.
///
/// Use the [`ObjectBody`] methods (`.bytes()`, `.text()`, `.bytes_stream()`)
/// to consume the response data.
pub struct GetObjectResponse {
    /// The response body.
    pub body: ObjectBody,
    /// Content type of the object.
    pub content_type: Option<String>,
    /// Content length in bytes.
    pub content_length: Option<u64>,
    /// ETag of the object.
    pub etag: Option<String>,
    /// Version ID of the returned object, present on version-enabled buckets.
    pub version_id: Option<String>,
    /// TOS request ID.
    pub request_id: Option<String>,
}

impl fmt::Debug for GetObjectResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectResponse")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("version_id", &self.version_id)
            .field("request_id", &self.request_id)
            .field("body", &self.body)
            .finish()
    }
}

/// Response from a DeleteObject operation.
#[derive(Debug)]
pub struct DeleteObjectResponse {
    /// TOS request ID.
    pub request_id: Option<String>,
}

/// Response from a HeadObject operation.
#[derive(Debug)]
pub struct HeadObjectResponse {
    /// Content type of the object.
    pub content_type: Option<String>,
    /// Content length in bytes.
    pub content_length: Option<u64>,
    /// ETag of the object.
    pub etag: Option<String>,
    /// Last modified timestamp (parsed from HTTP header).
    pub last_modified: Option<DateTime<Utc>>,
    /// Custom metadata (x-tos-meta-* headers).
    pub metadata: HashMap<String, String>,
    /// TOS request ID.
    pub request_id: Option<String>,
    /// CRC64-ECMA checksum of the whole object, as a decimal string.
    pub hash_crc64ecma: Option<String>,
    /// Object type (e.g. "Normal", "Appendable", "Symlink").
    pub object_type: Option<String>,
    /// Size in bytes of a symlink's target, when `object_type` is "Symlink".
    pub symlink_target_size: Option<u64>,
    /// Version ID of the returned object, present on version-enabled buckets.
    pub version_id: Option<String>,
}

/// Response from a CreateBucket operation.
#[derive(Debug)]
pub struct CreateBucketResponse {
    /// TOS request ID.
    pub request_id: Option<String>,
}

/// Response from a DeleteBucket operation.
#[derive(Debug)]
pub struct DeleteBucketResponse {
    /// TOS request ID.
    pub request_id: Option<String>,
}

/// Response from a ListBuckets (GetService) operation (XML-deserialized).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListBucketsResponse {
    /// The prefix used to filter results.
    #[serde(rename = "Prefix", default)]
    pub prefix: String,
    /// The marker used for pagination.
    #[serde(rename = "Marker", default)]
    pub marker: String,
    /// Maximum number of buckets returned.
    #[serde(rename = "MaxKeys")]
    pub max_keys: u32,
    /// Whether the results are truncated.
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    /// Marker to use for the next page of results.
    #[serde(rename = "NextMarker", default)]
    pub next_marker: Option<String>,
    /// Container for the bucket list.
    #[serde(rename = "Buckets", default)]
    pub buckets: BucketsContainer,
}

/// Wrapper container for the bucket list in XML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketsContainer {
    /// The list of buckets.
    #[serde(rename = "Bucket", default)]
    pub bucket: Vec<BucketInfo>,
}

/// Metadata for a single bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketInfo {
    /// Bucket name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Region/location of the bucket.
    #[serde(rename = "Location")]
    pub location: String,
    /// Creation date.
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
    /// Storage class.
    #[serde(rename = "StorageClass")]
    pub storage_class: StorageClass,
    /// Extranet endpoint.
    #[serde(rename = "ExtranetEndpoint", default)]
    pub extranet_endpoint: String,
    /// Intranet endpoint.
    #[serde(rename = "IntranetEndpoint", default)]
    pub intranet_endpoint: String,
}

/// Response from a GetBucketInfo operation (XML-deserialized).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "BucketInfo")]
pub struct GetBucketInfoResponse {
    /// The bucket metadata.
    #[serde(rename = "Bucket")]
    pub bucket: BucketInfoDetail,
}

/// Detailed bucket metadata from GetBucketInfo.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketInfoDetail {
    /// Bucket name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Region/location.
    #[serde(rename = "Location")]
    pub location: String,
    /// Creation date.
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
    /// Storage class.
    #[serde(rename = "StorageClass")]
    pub storage_class: StorageClass,
    /// Extranet endpoint.
    #[serde(rename = "ExtranetEndpoint", default)]
    pub extranet_endpoint: String,
    /// Intranet endpoint.
    #[serde(rename = "IntranetEndpoint", default)]
    pub intranet_endpoint: String,
    /// Access control list.
    #[serde(rename = "AccessControlList", default)]
    pub access_control_list: Option<AccessControlList>,
}

/// Access control list from GetBucketInfo.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessControlList {
    /// The grant permission.
    #[serde(rename = "Grant")]
    pub grant: String,
}

/// Response from an InitiateMultipartUpload operation (XML-deserialized).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "InitiateMultipartUploadResult")]
pub struct InitiateMultipartUploadResponse {
    /// Bucket name.
    #[serde(rename = "Bucket")]
    pub bucket: String,
    /// Object key.
    #[serde(rename = "Key")]
    pub key: String,
    /// Upload ID to use for subsequent part uploads.
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

/// Response from an UploadPart operation.
#[derive(Debug)]
pub struct UploadPartResponse {
    /// ETag of the uploaded part.
    pub etag: String,
}

/// Response from a CompleteMultipartUpload operation (XML-deserialized).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "CompleteMultipartUploadResult")]
pub struct CompleteMultipartUploadResponse {
    /// URL location of the completed object.
    #[serde(rename = "Location")]
    pub location: String,
    /// Bucket name.
    #[serde(rename = "Bucket")]
    pub bucket: String,
    /// Object key.
    #[serde(rename = "Key")]
    pub key: String,
    /// ETag of the completed object.
    #[serde(rename = "ETag")]
    pub etag: String,
    /// CRC64-ECMA checksum of the whole object, as a decimal string.
    #[serde(skip)]
    pub hash_crc64ecma: Option<String>,
    /// Version ID of the completed object, if versioning is enabled on the bucket.
    #[serde(skip)]
    pub version_id: Option<String>,
    /// Parts the server assembled, populated only when the request used `complete_all`
    /// without a callback.
    #[serde(skip)]
    pub completed_parts: Option<Vec<PartInfo>>,
    /// The server-side callback's response body, populated only when a callback was set.
    #[serde(skip)]
    pub callback_result: Option<String>,
}

/// Metadata for a single part, as reported by a completed multipart upload.
#[derive(Debug, Clone, Deserialize)]
pub struct PartInfo {
    /// Part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Last modified timestamp.
    #[serde(rename = "LastModified")]
    pub last_modified: DateTime<Utc>,
    /// ETag of the part.
    #[serde(rename = "ETag")]
    pub etag: String,
    /// Size in bytes.
    #[serde(rename = "Size")]
    pub size: u64,
}

/// Response from an AbortMultipartUpload operation.
#[derive(Debug)]
pub struct AbortMultipartUploadResponse {
    /// TOS request ID.
    pub request_id: Option<String>,
}

/// Response from a GetBucketLocation operation.
#[derive(Debug, Clone)]
pub struct GetBucketLocationResponse {
    /// The region/location string (e.g., "tos-cn-beijing").
    pub location: String,
}

/// Internal XML wrapper for deserializing `<LocationConstraint>`.
#[derive(Deserialize)]
#[serde(rename = "LocationConstraint")]
pub(crate) struct LocationConstraintXml {
    #[serde(rename = "$text")]
    pub location: String,
}
