//! Request and response types for TOS operations.

pub mod common;
pub mod request;
pub mod response;

pub use common::{BucketName, MetadataDirective, ObjectAcl, ObjectKey, Region, StorageClass};
pub use request::{
    AbortMultipartUploadRequest, AbortMultipartUploadRequestBuilder,
    CompleteMultipartUploadRequest, CompleteMultipartUploadRequestBuilder,
    CompleteMultipartUploadXml, CompletedPart, DeleteObjectRequest, DeleteObjectRequestBuilder,
    GetObjectRequest, GetObjectRequestBuilder, HeadObjectRequest, HeadObjectRequestBuilder,
    InitiateMultipartUploadRequest, InitiateMultipartUploadRequestBuilder, PutObjectRequest,
    PutObjectRequestBuilder, UploadPartRequest, UploadPartRequestBuilder,
};
pub use response::{
    AbortMultipartUploadResponse, CompleteMultipartUploadResponse, DeleteObjectResponse,
    GetObjectResponse, HeadObjectResponse, InitiateMultipartUploadResponse, ObjectBody, PartInfo,
    PutObjectResponse, UploadPartResponse,
};
