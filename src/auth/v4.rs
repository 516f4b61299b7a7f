//! TOS V4 signature implementation (TOS4-HMAC-SHA256).
//!
//! Implements the complete signing flow for Volcengine TOS V4 authentication,
//! including canonical request construction, string-to-sign generation,
//! signing key derivation, and authorization header assembly.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::percent_encode;
use reqwest::header::HeaderMap;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::config::Credentials;
use crate::encoding::{QUERY_ENCODE_SET, URI_ENCODE_SET};
use crate::error::TosError;
use crate::types::Region;

type HmacSha256 = Hmac<Sha256>;

/// Percent-encode the URI path, preserving forward slashes.
pub(crate) fn canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    percent_encode(path.as_bytes(), URI_ENCODE_SET).to_string()
}

/// Sort and percent-encode query parameters.
fn canonical_query_string(url: &url::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                percent_encode(k.as_bytes(), QUERY_ENCODE_SET).to_string(),
                percent_encode(v.as_bytes(), QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build canonical headers string and signed headers list.
///
/// Headers are lowercased, trimmed, and sorted by name.
fn canonical_and_signed_headers(headers: &HeaderMap) -> (String, String) {
    let mut header_list: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_lowercase(),
                value.to_str().unwrap_or("").trim().to_string(),
            )
        })
        .collect();
    header_list.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical = header_list
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect::<String>();

    let signed = header_list
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    (canonical, signed)
}

/// Assemble the canonical request string and return it alongside the signed headers.
fn build_canonical_request(
    method: &str,
    url: &url::Url,
    headers: &HeaderMap,
    payload_hash: &str,
) -> (String, String) {
    let uri = canonical_uri(url.path());
    let query = canonical_query_string(url);
    let (canonical_hdrs, signed_hdrs) = canonical_and_signed_headers(headers);

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method, uri, query, canonical_hdrs, signed_hdrs, payload_hash
    );

    (canonical_request, signed_hdrs)
}

/// Build the string-to-sign from the datetime, scope, and canonical request.
pub(crate) fn build_string_to_sign(
    datetime: &str,
    date: &str,
    region: &str,
    canonical_request: &str,
) -> String {
    let hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!(
        "TOS4-HMAC-SHA256\n{}\n{}/{}/tos/request\n{}",
        datetime, date, region, hash
    )
}

/// Compute HMAC-SHA256, returning an error instead of panicking.
fn hmac_sha256(key: &[u8], data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TosError::Auth(format!("HMAC key error: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key using the HMAC chain.
///
/// Chain: HMAC("tos_v4" + secret, date) → HMAC(prev, region) → HMAC(prev, "tos")
///        → HMAC(prev, "aliyun_v4_request")
///
/// The intermediate and final keys are wrapped in [`Zeroizing`] to ensure
/// cryptographic material is wiped from memory on drop.
pub(crate) fn derive_signing_key(
    secret: &str,
    date: &str,
    region: &str,
) -> crate::error::Result<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(format!("aliyun_v4{secret}"));

    let date_key = Zeroizing::new(hmac_sha256(key.as_bytes(), date.as_bytes())?);
    let region_key = Zeroizing::new(hmac_sha256(&date_key, region.as_bytes())?);
    let service_key = Zeroizing::new(hmac_sha256(&region_key, b"tos")?);
    let signing_key = hmac_sha256(&service_key, b"aliyun_v4_request")?;

    Ok(Zeroizing::new(signing_key))
}

pub(crate) fn calculate_signature(
    signing_key: &[u8],
    string_to_sign: &str,
) -> crate::error::Result<String> {
    let sig_bytes = hmac_sha256(signing_key, string_to_sign.as_bytes())?;
    Ok(hex::encode(sig_bytes))
}

/// Sign a request using TOS V4 signature (TOS4-HMAC-SHA256).
///
/// Adds `x-tos-date`, `x-tos-content-sha256`, and `Authorization` headers
/// to the provided request.
///
/// # Errors
///
/// Returns [`TosError::Auth`] if any header value cannot be constructed.
pub fn sign_request(
    req: &mut reqwest::Request,
    credentials: &Credentials,
    region: &Region,
    datetime: DateTime<Utc>,
) -> crate::error::Result<()> {
    let datetime_str = datetime.format("%Y%m%dT%H%M%SZ").to_string();
    let date_str = datetime.format("%Y%m%d").to_string();
    let region_str: &str = region.as_ref();

    // Compute payload hash
    let payload_hash = if let Some(body) = req.body() {
        if let Some(bytes) = body.as_bytes() {
            hex::encode(Sha256::digest(bytes))
        } else {
            "UNSIGNED-PAYLOAD".to_string()
        }
    } else {
        hex::encode(Sha256::digest(b""))
    };

    // Set required headers BEFORE building canonical request
    let headers = req.headers_mut();
    headers.insert(
        "x-tos-date",
        datetime_str
            .parse()
            .map_err(|_| TosError::Auth("failed to set x-tos-date header".to_string()))?,
    );
    headers.insert(
        "x-tos-content-sha256",
        payload_hash
            .parse()
            .map_err(|_| TosError::Auth("failed to set x-tos-content-sha256 header".to_string()))?,
    );

    if let Some(token) = credentials.security_token() {
        headers.insert(
            "x-tos-security-token",
            token.parse().map_err(|_| {
                TosError::Auth("failed to set x-tos-security-token header".to_string())
            })?,
        );
    }

    // Build canonical request
    let method = req.method().as_str().to_string();
    let url = req.url().clone();
    let (canonical_request, signed_headers) =
        build_canonical_request(&method, &url, req.headers(), &payload_hash);

    // Build string to sign
    let string_to_sign =
        build_string_to_sign(&datetime_str, &date_str, region_str, &canonical_request);

    let signing_key = derive_signing_key(credentials.access_key_secret(), &date_str, region_str)?;

    let signature = calculate_signature(&signing_key, &string_to_sign)?;

    // Build authorization header
    let credential = format!(
        "{}/{}/{}/tos/request",
        credentials.access_key_id(),
        date_str,
        region_str,
    );
    let auth_value = format!(
        "TOS4-HMAC-SHA256 Credential={}, SignedHeaders={}, Signature={}",
        credential, signed_headers, signature,
    );

    req.headers_mut().insert(
        "authorization",
        auth_value
            .parse()
            .map_err(|_| TosError::Auth("failed to set authorization header".to_string()))?,
    );

    Ok(())
}
