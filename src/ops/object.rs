//! Object operations: PutObject, GetObject, DeleteObject, HeadObject.

use std::collections::HashMap;

use reqwest::Method;

use crate::client::{TosClient, header_etag, header_etag_opt, header_opt};
use crate::error::Result;
use crate::types::request::{
    DeleteObjectRequest, GetObjectRequest, HeadObjectRequest, PutObjectRequest,
};
use crate::types::response::{
    DeleteObjectResponse, GetObjectResponse, HeadObjectResponse, ObjectBody, PutObjectResponse,
};

impl TosClient {
    /// Upload an object to TOS.
    ///
    /// # Payload Signing
    ///
    /// When the body is backed by in-memory bytes (e.g., `Vec<u8>`, `Bytes`),
    /// the SDK computes a SHA-256 hash of the payload and includes it in the
    /// V4 signature. When the body is a non-buffered stream, the SDK uses
    /// `UNSIGNED-PAYLOAD` — the request is still authenticated via the
    /// Authorization header, but the payload itself is not integrity-checked
    /// by the signature. TOS may still validate Content-MD5 or CRC64 if
    /// those headers are present.
    ///
    /// # Examples
    /// ```no_run
    /// # use rs_tos::*;
    /// # use rs_tos::types::request::PutObjectRequestBuilder;
    /// # async fn example(client: TosClient) -> Result<()> {
    /// let request = PutObjectRequestBuilder::new()
    ///     .bucket(BucketName::new("my-bucket")?)
    ///     .key(ObjectKey::new("hello.txt")?)
    ///     .body(b"Hello, TOS!".to_vec())
    ///     .content_type("text/plain")
    ///     .build()?;
    /// let response = client.put_object(request).await?;
    /// println!("ETag: {}", response.etag);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectResponse> {
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &[])?;
        let mut http_req = self.http_client().request(Method::PUT, url);

        if let Some(ref ct) = request.content_type {
            http_req = http_req.header("content-type", ct.as_str());
        }
        if let Some(sc) = request.storage_class {
            http_req = http_req.header("x-tos-storage-class", sc.to_string());
        }
        if let Some(acl) = request.acl {
            http_req = http_req.header("x-tos-object-acl", acl.to_string());
        }
        for (k, v) in &request.metadata {
            http_req = http_req.header(format!("x-tos-meta-{k}"), v.as_str());
        }

        let http_req = http_req.body(request.body).build()?;
        let response = self.execute(http_req).await?;

        let etag = header_etag(&response);
        let request_id = header_opt(&response, "x-tos-request-id");

        Ok(PutObjectResponse { etag, request_id })
    }

    /// Download an object from TOS.
    ///
    /// Returns a streaming response — the body is NOT buffered in memory.
    pub async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectResponse> {
        let query: &[(&str, &str)] = match request.version_id {
            Some(ref v) => &[("versionId", v.as_str())],
            None => &[],
        };
        let url = self.build_url(Some(&request.bucket), Some(&request.key), query)?;
        let mut http_req = self.http_client().request(Method::GET, url);

        if let Some(ref range) = request.range {
            http_req = http_req.header("range", range.as_str());
        }
        if let Some(ref if_match) = request.if_match {
            http_req = http_req.header("if-match", if_match.as_str());
        }
        if let Some(limit) = request.traffic_limit {
            http_req = http_req.header("x-tos-traffic-limit", limit.to_string());
        }

        let http_req = http_req.build()?;
        let response = self.execute(http_req).await?;

        let content_type = header_opt(&response, "content-type");
        let content_length = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let etag = header_etag_opt(&response);
        let version_id = header_opt(&response, "x-tos-version-id");
        let request_id = header_opt(&response, "x-tos-request-id");

        Ok(GetObjectResponse {
            body: ObjectBody::new(response),
            content_type,
            content_length,
            etag,
            version_id,
            request_id,
        })
    }

    /// Delete an object from TOS.
    pub async fn delete_object(
        &self,
        request: DeleteObjectRequest,
    ) -> Result<DeleteObjectResponse> {
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &[])?;
        let http_req = self.http_client().request(Method::DELETE, url).build()?;
        let response = self.execute(http_req).await?;

        let request_id = header_opt(&response, "x-tos-request-id");

        Ok(DeleteObjectResponse { request_id })
    }

    /// Retrieve object metadata without downloading the body.
    pub async fn head_object(&self, request: HeadObjectRequest) -> Result<HeadObjectResponse> {
        let query: &[(&str, &str)] = match request.version_id {
            Some(ref v) => &[("versionId", v.as_str())],
            None => &[],
        };
        let url = self.build_url(Some(&request.bucket), Some(&request.key), query)?;
        let http_req = self.http_client().request(Method::HEAD, url).build()?;
        let response = self.execute(http_req).await?;

        let content_type = header_opt(&response, "content-type");
        let content_length = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let etag = header_etag_opt(&response);
        let last_modified = header_opt(&response, "last-modified").and_then(|s| {
            chrono::DateTime::parse_from_rfc2822(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .ok()
                .or_else(|| {
                    s.find(", ").and_then(|pos| {
                        chrono::NaiveDateTime::parse_from_str(
                            &s[pos + 2..],
                            "%d %b %Y %H:%M:%S GMT",
                        )
                        .ok()
                        .map(|dt| dt.and_utc())
                    })
                })
        });
        let request_id = header_opt(&response, "x-tos-request-id");
        let version_id = header_opt(&response, "x-tos-version-id");
        let hash_crc64ecma = header_opt(&response, "x-tos-hash-crc64ecma");
        let object_type = header_opt(&response, "x-tos-object-type");
        let symlink_target_size = header_opt(&response, "x-tos-symlink-target-size")
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| crate::error::TosError::InvalidParameter {
                        field: "x-tos-symlink-target-size".into(),
                        reason: format!("non-numeric value: '{s}'"),
                    })
            })
            .transpose()?;

        let mut metadata = HashMap::new();
        for (name, value) in response.headers() {
            if let Some(meta_key) = name.as_str().strip_prefix("x-tos-meta-")
                && let Ok(v) = value.to_str()
            {
                metadata.insert(meta_key.to_string(), v.to_string());
            }
        }

        Ok(HeadObjectResponse {
            content_type,
            content_length,
            etag,
            last_modified,
            metadata,
            request_id,
            hash_crc64ecma,
            object_type,
            symlink_target_size,
            version_id,
        })
    }
}
