//! Multipart upload operations: Initiate, UploadPart, Complete, Abort.

use reqwest::Method;

use crate::client::{TosClient, header_etag, header_opt, parse_xml, serialize_xml};
use crate::error::Result;
use crate::types::request::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompleteMultipartUploadXml,
    InitiateMultipartUploadRequest, UploadPartRequest,
};
use crate::types::response::{
    AbortMultipartUploadResponse, CompleteMultipartUploadResponse, InitiateMultipartUploadResponse,
    PartInfo, UploadPartResponse,
};

/// Parse the `Part` list the server includes in a `completeAll` response body.
///
/// Absent on a normal (explicit-parts) completion and tolerated as empty if
/// the server's `completeAll` response carries no parts at all.
fn parse_completed_parts(body: &str) -> Option<Vec<PartInfo>> {
    #[derive(serde::Deserialize)]
    struct PartsXml {
        #[serde(rename = "Part", default)]
        part: Vec<PartInfo>,
    }
    quick_xml::de::from_str::<PartsXml>(body)
        .ok()
        .filter(|parsed| !parsed.part.is_empty())
        .map(|parsed| parsed.part)
}

impl TosClient {
    /// Initiate a multipart upload and obtain an upload ID.
    pub async fn initiate_multipart_upload(
        &self,
        request: InitiateMultipartUploadRequest,
    ) -> Result<InitiateMultipartUploadResponse> {
        let url = self.build_url(
            Some(&request.bucket),
            Some(&request.key),
            &[("uploads", "")],
        )?;
        let mut http_req = self.http_client().request(Method::POST, url);

        if let Some(ref ct) = request.content_type {
            http_req = http_req.header("content-type", ct.as_str());
        }
        if let Some(sc) = request.storage_class {
            http_req = http_req.header("x-tos-storage-class", sc.to_string());
        }

        let http_req = http_req.build()?;
        let response = self.execute(http_req).await?;

        let body = response.text().await?;
        let init_resp: InitiateMultipartUploadResponse = parse_xml(&body)?;

        Ok(init_resp)
    }

    /// Upload a single part of a multipart upload.
    ///
    /// # Payload Signing
    ///
    /// When the body is in-memory bytes the SDK computes a SHA-256 payload
    /// hash for the V4 signature. For non-buffered streaming bodies the SDK
    /// uses `UNSIGNED-PAYLOAD` — the request is authenticated but the payload
    /// is not integrity-checked by the signature.
    pub async fn upload_part(&self, request: UploadPartRequest) -> Result<UploadPartResponse> {
        let part_num = request.part_number.to_string();
        let query = [
            ("partNumber", part_num.as_str()),
            ("uploadId", request.upload_id.as_str()),
        ];
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &query)?;
        let mut http_req = self.http_client().request(Method::PUT, url);
        if let Some(limit) = request.traffic_limit {
            http_req = http_req.header("x-tos-traffic-limit", limit.to_string());
        }
        let http_req = http_req.body(request.body).build()?;
        let response = self.execute(http_req).await?;

        let etag = header_etag(&response);

        Ok(UploadPartResponse { etag })
    }

    /// Complete a multipart upload by assembling previously uploaded parts.
    ///
    /// If `request.complete_all` is set, no part list is sent and the server
    /// assembles the object from every part it already has for this upload ID.
    pub async fn complete_multipart_upload(
        &self,
        request: CompleteMultipartUploadRequest,
    ) -> Result<CompleteMultipartUploadResponse> {
        let query = [("uploadId", request.upload_id.as_str())];
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &query)?;

        let mut http_req = self
            .http_client()
            .request(Method::POST, url)
            .header("content-type", "application/xml");

        if request.complete_all {
            http_req = http_req.header("x-tos-complete-all", "yes");
        }
        if request.forbid_overwrite {
            http_req = http_req.header("x-tos-forbid-overwrite", "true");
        }
        if let Some(ref callback) = request.callback {
            http_req = http_req.header("x-tos-callback", callback.as_str());
        }
        if let Some(ref callback_var) = request.callback_var {
            http_req = http_req.header("x-tos-callback-var", callback_var.as_str());
        }

        let has_callback = request.callback.is_some();
        let http_req = if request.complete_all {
            http_req.build()?
        } else {
            let xml_body = CompleteMultipartUploadXml {
                parts: request.parts,
            };
            let body_str = serialize_xml(&xml_body)?;
            http_req.body(body_str).build()?
        };
        let response = self.execute(http_req).await?;

        let hash_crc64ecma = header_opt(&response, "x-tos-hash-crc64ecma");
        let version_id = header_opt(&response, "x-tos-version-id");
        let body = response.text().await?;

        // With a callback set, the server replaces the usual completion XML
        // with the callback's own response body; there is nothing to parse as XML.
        let mut complete_resp = if has_callback {
            CompleteMultipartUploadResponse {
                location: String::new(),
                bucket: String::new(),
                key: String::new(),
                etag: String::new(),
                hash_crc64ecma: None,
                version_id: None,
                completed_parts: None,
                callback_result: Some(body),
            }
        } else {
            parse_xml(&body)?
        };
        complete_resp.hash_crc64ecma = hash_crc64ecma;
        complete_resp.version_id = version_id;

        if request.complete_all && !has_callback {
            complete_resp.completed_parts = parse_completed_parts(&body);
        }

        Ok(complete_resp)
    }

    /// Abort a multipart upload and discard all uploaded parts.
    pub async fn abort_multipart_upload(
        &self,
        request: AbortMultipartUploadRequest,
    ) -> Result<AbortMultipartUploadResponse> {
        let query = [("uploadId", request.upload_id.as_str())];
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &query)?;
        let http_req = self.http_client().request(Method::DELETE, url).build()?;
        let response = self.execute(http_req).await?;

        let request_id = header_opt(&response, "x-tos-request-id");

        Ok(AbortMultipartUploadResponse { request_id })
    }
}
