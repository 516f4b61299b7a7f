//! Common newtypes and enums shared across OSS operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TosError, Result};

/// A TOS bucket name, validated on construction.
///
/// Bucket names must be 3-63 characters long, contain only lowercase letters,
/// digits, and hyphens, and must not start or end with a hyphen.
///
/// # Examples
/// ```
/// # use rs_tos::types::BucketName;
/// let bucket = BucketName::new("my-bucket").unwrap();
/// assert_eq!(bucket.as_ref(), "my-bucket");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketName(String);

impl BucketName {
    /// Create a new validated bucket name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() < 3 || name.len() > 63 {
            return Err(TosError::InvalidBucketName(format!(
                "must be 3-63 characters, got {}",
                name.len()
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(TosError::InvalidBucketName(
                "must contain only lowercase letters, digits, and hyphens".to_string(),
            ));
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(TosError::InvalidBucketName(
                "must not start or end with a hyphen".to_string(),
            ));
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A TOS object key, validated on construction.
///
/// Object keys must be 1-1023 bytes long and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new validated object key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(TosError::InvalidObjectKey("must not be empty".to_string()));
        }
        if key.len() > 1023 {
            return Err(TosError::InvalidObjectKey(format!(
                "must be at most 1023 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A TOS region identifier, validated on construction.
///
/// Region identifiers must be non-empty and contain only lowercase letters,
/// digits, and hyphens (e.g., "cn-beijing", "us-west-1").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    /// Create a new validated region.
    pub fn new(region: impl Into<String>) -> Result<Self> {
        let region = region.into();
        if region.is_empty() {
            return Err(TosError::InvalidRegion("must not be empty".to_string()));
        }
        if !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(TosError::InvalidRegion(
                "must contain only lowercase letters, digits, and hyphens".to_string(),
            ));
        }
        Ok(Self(region))
    }
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// TOS storage class for objects and buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    /// Standard storage (default).
    #[serde(rename = "Standard")]
    Standard,
    /// Infrequent access storage.
    #[serde(rename = "IA")]
    InfrequentAccess,
    /// Archive storage.
    #[serde(rename = "Archive")]
    Archive,
    /// Cold archive storage.
    #[serde(rename = "ColdArchive")]
    ColdArchive,
    /// Deep cold archive storage.
    #[serde(rename = "DeepColdArchive")]
    DeepColdArchive,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::InfrequentAccess => write!(f, "IA"),
            Self::Archive => write!(f, "Archive"),
            Self::ColdArchive => write!(f, "ColdArchive"),
            Self::DeepColdArchive => write!(f, "DeepColdArchive"),
        }
    }
}

/// TOS object or bucket access control level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectAcl {
    /// Private (owner only).
    #[serde(rename = "private")]
    Private,
    /// Public read access.
    #[serde(rename = "public-read")]
    PublicRead,
    /// Public read-write access.
    #[serde(rename = "public-read-write")]
    PublicReadWrite,
    /// Inherit from bucket (default).
    #[serde(rename = "default")]
    Default,
}

impl fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::PublicRead => write!(f, "public-read"),
            Self::PublicReadWrite => write!(f, "public-read-write"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Bucket access control level.
///
/// Defines the access permissions for a bucket. Each level grants
/// different permissions to the public and authenticated users.
///
/// # Variants
///
/// * `Private` - Only the bucket owner has access
/// * `PublicRead` - Owner has full access, public has read access
/// * `PublicReadWrite` - Everyone has full access (use with caution)
///
/// # Examples
///
/// ```
/// # use rs_tos::types::BucketAcl;
/// let acl = BucketAcl::PublicRead;
/// assert_eq!(acl.to_string(), "public-read");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketAcl {
    /// Private access (bucket owner only).
    #[serde(rename = "private")]
    Private,
    /// Public read access.
    #[serde(rename = "public-read")]
    PublicRead,
    /// Public read-write access.
    #[serde(rename = "public-read-write")]
    PublicReadWrite,
}

impl fmt::Display for BucketAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::PublicRead => write!(f, "public-read"),
            Self::PublicReadWrite => write!(f, "public-read-write"),
        }
    }
}

/// Metadata directive for CopyObject operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataDirective {
    /// Copy metadata from the source object (default).
    #[serde(rename = "COPY")]
    Copy,
    /// Replace metadata with values provided in the request.
    #[serde(rename = "REPLACE")]
    Replace,
}

impl fmt::Display for MetadataDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "COPY"),
            Self::Replace => write!(f, "REPLACE"),
        }
    }
}

/// HTTP methods allowed in CORS rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorsHttpMethod {
    /// GET method.
    #[serde(rename = "GET")]
    Get,
    /// PUT method.
    #[serde(rename = "PUT")]
    Put,
    /// DELETE method.
    #[serde(rename = "DELETE")]
    Delete,
    /// POST method.
    #[serde(rename = "POST")]
    Post,
    /// HEAD method.
    #[serde(rename = "HEAD")]
    Head,
}

impl fmt::Display for CorsHttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Post => write!(f, "POST"),
            Self::Head => write!(f, "HEAD"),
        }
    }
}

/// Bucket versioning status.
///
/// Controls whether versioning is enabled for objects in a bucket.
/// Once enabled, versioning cannot be disabled, only suspended.
///
/// # Variants
///
/// * `Enabled` - Versioning is enabled for the bucket
/// * `Suspended` - Versioning is suspended (no new versions created)
///
/// # Examples
///
/// ```
/// # use rs_tos::types::VersioningStatus;
/// let status = VersioningStatus::Enabled;
/// assert_eq!(status.to_string(), "Enabled");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning is enabled.
    #[serde(rename = "Enabled")]
    Enabled,
    /// Versioning is suspended.
    #[serde(rename = "Suspended")]
    Suspended,
}

impl fmt::Display for VersioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "Enabled"),
            Self::Suspended => write!(f, "Suspended"),
        }
    }
}

/// Server-side encryption algorithm for bucket and objects.
///
/// Defines the encryption method used for server-side encryption.
///
/// # Variants
///
/// * `AES256` - AES-256 server-side encryption
/// * `KMS` - Key Management Service encryption
///
/// # Examples
///
/// ```
/// # use rs_tos::types::ServerSideEncryption;
/// let sse = ServerSideEncryption::AES256;
/// assert_eq!(sse.to_string(), "AES256");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerSideEncryption {
    /// AES-256 encryption.
    #[serde(rename = "AES256")]
    AES256,
    /// KMS encryption.
    #[serde(rename = "KMS")]
    KMS,
}

impl fmt::Display for ServerSideEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AES256 => write!(f, "AES256"),
            Self::KMS => write!(f, "KMS"),
        }
    }
}
