//! TOS client implementation.

use std::cmp;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use url::Url;

use crate::auth;
use crate::config::Config;
use crate::error::{TosError, Result};
use crate::middleware::{InterceptorChain, InterceptorContext, RequestOutcome};
use crate::types::{BucketName, ObjectKey};

/// The main client for interacting with Volcengine TOS.
///
/// # Examples
/// ```no_run
/// use rs_tos::{TosClient, ClientBuilder};
///
/// # async fn example() -> rs_tos::Result<()> {
/// let client = TosClient::from_builder(
///     ClientBuilder::new()
///         .access_key_id("your-key-id")
///         .access_key_secret("your-key-secret")
///         .region("cn-beijing")
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TosClient {
    http_client: reqwest::Client,
    config: Config,
    interceptors: InterceptorChain,
}

// Compile-time assertion: TosClient must be Send + Sync for safe async usage.
const _: fn() = || {
    fn must_be_send_sync<T: Send + Sync>() {}
    must_be_send_sync::<TosClient>();
};

const AUTH_HEADERS: &[&str] = &[
    "authorization",
    "x-tos-date",
    "x-tos-content-sha256",
    "x-tos-security-token",
];

impl TosClient {
    /// Create a new client with the given configuration.
    ///
    /// Applies connection pool settings and timeouts from the config.
    /// Returns an error if the underlying HTTP client cannot be constructed
    /// (e.g., TLS backend unavailable).
    pub fn new(config: Config) -> Result<Self> {
        let tc = config.timeout_config();
        let pc = config.pool_config();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(tc.connect_timeout)
            .read_timeout(tc.read_timeout)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .user_agent(format!("rs-tos/{}", env!("CARGO_PKG_VERSION")));

        if let Some(max) = pc.max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        if let Some(timeout) = pc.idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }

        let http_client = builder.build().map_err(TosError::Http)?;
        Ok(Self {
            http_client,
            config,
            interceptors: InterceptorChain::new(),
        })
    }

    /// Create a new client with a custom HTTP client.
    ///
    /// # Security
    ///
    /// When you supply your own [`reqwest::Client`], the SDK **skips** the
    /// default transport configuration applied by [`TosClient::new`]. This
    /// means the caller is responsible for ensuring the custom client meets
    /// the following security requirements:
    ///
    /// * **TLS version** — the default client enforces a minimum of TLS 1.2.
    ///   A custom client may allow older, insecure TLS versions.
    /// * **User-Agent** — the default client sets `rs-tos/{version}` on
    ///   every request. A custom client will use whatever User-Agent (or
    ///   none) it was built with.
    /// * **Timeouts** — the default client configures connect and read
    ///   timeouts. A custom client with no timeouts may hang indefinitely.
    /// * **Connection pool** — the default client tunes pool idle timeouts.
    ///   A custom client uses its own pool settings.
    ///
    /// Use this method only when you need fine-grained control over the HTTP
    /// transport (e.g., custom proxy, client certificates, or connection
    /// tuning) and are confident in the security posture of the provided
    /// client.
    pub fn with_http_client(config: Config, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            config,
            interceptors: InterceptorChain::new(),
        }
    }

    /// Create a client from a builder.
    pub fn from_builder(builder: crate::config::ClientBuilder) -> Result<Self> {
        let config = builder.build()?;
        Self::new(config)
    }

    /// Register an interceptor to observe request/response lifecycle events.
    ///
    /// Interceptors are called in registration order. Use for logging, metrics,
    /// or rate limiting.
    pub fn interceptor(mut self, interceptor: Arc<dyn crate::middleware::Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Returns a reference to the underlying configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn endpoint(&self, bucket: Option<&BucketName>) -> String {
        if let Some(custom) = self.config.endpoint() {
            return custom.trim_end_matches('/').to_string();
        }
        let region: &str = self.config.region().as_ref();
        match bucket {
            Some(b) if !self.config.use_path_style() => {
                format!("https://{}.tos-{}.volces.com", b, region)
            }
            _ => format!("https://tos-{}.volces.com", region),
        }
    }

    /// Build a full URL for an TOS request.
    ///
    /// When path-style is enabled, the bucket name is prepended to the URL path
    /// instead of being used as a virtual-hosted subdomain.
    pub(crate) fn build_url(
        &self,
        bucket: Option<&BucketName>,
        key: Option<&ObjectKey>,
        query: &[(&str, &str)],
    ) -> Result<Url> {
        let base = self.endpoint(bucket);

        let path = if self.config.use_path_style() {
            match (bucket, key) {
                (Some(b), Some(k)) => format!("{}/{}/{}", base, b, k),
                (Some(b), None) => format!("{}/{}/", base, b),
                (None, Some(k)) => format!("{}/{}", base, k),
                (None, None) => format!("{}/", base),
            }
        } else {
            match key {
                Some(k) => format!("{}/{}", base, k),
                None => format!("{}/", base),
            }
        };

        let mut url = Url::parse(&path).map_err(|e| TosError::InvalidUrl(e.to_string()))?;
        for (k, v) in query {
            url.query_pairs_mut().append_pair(k, v);
        }
        Ok(url)
    }

    /// Sign and execute an HTTP request with automatic retry, interceptors,
    /// and optional request timeout.
    pub(crate) async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        match self.config.timeout_config().request_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.execute_inner(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(TosError::Timeout(deadline)),
                }
            }
            None => self.execute_inner(request).await,
        }
    }

    async fn execute_inner(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let retry_config = self.config.retry_config();
        let method = request.method().clone();
        let url_str = request.url().to_string();

        let can_retry = request
            .body()
            .map(|b| b.as_bytes().is_some())
            .unwrap_or(true);
        let max_attempts = if can_retry {
            retry_config.max_retries + 1
        } else {
            1
        };

        let url = request.url().clone();
        let req_method = request.method().clone();
        let headers = request.headers().clone();
        let body_bytes = request
            .body()
            .and_then(|b| b.as_bytes().map(|b| b.to_vec()));

        let has_interceptors = !self.interceptors.is_empty();
        let mut last_err = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let base = retry_config.base_delay * 2u32.saturating_pow(attempt - 1);
                let capped = cmp::min(base, retry_config.max_delay);
                // Deterministic jitter: use 50-100% of delay based on URL hash and attempt
                let jitter_numer = (url_str.len() as u64 * attempt as u64) % 50 + 50;
                let delay_ms = capped.as_millis() as u64 * jitter_numer / 100;
                let delay = std::time::Duration::from_millis(delay_ms);
                tracing::warn!(%method, %url_str, attempt, ?delay, "retrying TOS request");
                tokio::time::sleep(delay).await;
            }

            let mut new_req = reqwest::Request::new(req_method.clone(), url.clone());
            for (name, value) in headers.iter() {
                if !AUTH_HEADERS.contains(&name.as_str()) {
                    new_req.headers_mut().insert(name.clone(), value.clone());
                }
            }
            if let Some(ref bytes) = body_bytes {
                *new_req.body_mut() = Some(reqwest::Body::from(bytes.clone()));
            }

            auth::sign_request(
                &mut new_req,
                self.config.credentials(),
                self.config.region(),
                Utc::now(),
            )?;

            if has_interceptors {
                let ctx = InterceptorContext {
                    method: method.to_string(),
                    url: url_str.clone(),
                    attempt,
                };
                if let Err(reason) = self.interceptors.before_request(&ctx) {
                    return Err(TosError::Auth(reason));
                }
            }

            tracing::debug!(%method, %url_str, attempt, "executing TOS request");

            let start = Instant::now();
            match self.http_client.execute(new_req).await {
                Ok(response) => {
                    let elapsed = start.elapsed();
                    let status = response.status();

                    if has_interceptors {
                        let ctx = InterceptorContext {
                            method: method.to_string(),
                            url: url_str.clone(),
                            attempt,
                        };
                        self.interceptors.after_request(
                            &ctx,
                            &RequestOutcome {
                                status: Some(status.as_u16()),
                                duration: elapsed,
                                success: status.is_success(),
                                error: None,
                            },
                        );
                    }

                    if status.is_server_error() && attempt + 1 < max_attempts {
                        let body = Self::read_error_body(response).await;
                        tracing::warn!(%method, %url_str, %status, "server error, will retry");
                        last_err = Some(TosError::from_response_body(status, &body));
                        continue;
                    }
                    if !status.is_success() {
                        let body = Self::read_error_body(response).await;
                        tracing::warn!(%method, %url_str, %status, "TOS request failed");
                        return Err(TosError::from_response_body(status, &body));
                    }
                    tracing::debug!(%method, %url_str, %status, "TOS request succeeded");
                    return Ok(response);
                }
                Err(e) => {
                    let elapsed = start.elapsed();

                    if has_interceptors {
                        let ctx = InterceptorContext {
                            method: method.to_string(),
                            url: url_str.clone(),
                            attempt,
                        };
                        self.interceptors.after_request(
                            &ctx,
                            &RequestOutcome {
                                status: None,
                                duration: elapsed,
                                success: false,
                                error: Some(e.to_string()),
                            },
                        );
                    }

                    if Self::is_retryable_error(&e) && attempt + 1 < max_attempts {
                        tracing::warn!(%method, %url_str, error = %e, "transient error, will retry");
                        last_err = Some(TosError::Http(e));
                        continue;
                    }
                    return Err(TosError::Http(e));
                }
            }
        }

        Err(match last_err {
            Some(e) => TosError::RetryExhausted {
                attempts: max_attempts,
                last_error: Box::new(e),
            },
            None => TosError::RetryExhausted {
                attempts: max_attempts,
                last_error: Box::new(TosError::Auth("unknown error".to_string())),
            },
        })
    }

    async fn read_error_body(response: reqwest::Response) -> String {
        const MAX_ERROR_BODY: usize = 1024 * 1024; // 1 MB limit
        match response.bytes().await {
            Ok(bytes) => {
                let limited = if bytes.len() > MAX_ERROR_BODY {
                    &bytes[..MAX_ERROR_BODY]
                } else {
                    &bytes
                };
                String::from_utf8_lossy(limited).into_owned()
            }
            Err(e) => {
                tracing::debug!("failed to read error response body: {e}");
                String::new()
            }
        }
    }

    fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    /// Returns a reference to the underlying HTTP client.
    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

pub(crate) fn header_opt(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub(crate) fn header_etag(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim_matches('"')
        .to_string()
}

pub(crate) fn parse_xml<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    quick_xml::de::from_str(body).map_err(|e| TosError::XmlParse(e.to_string()))
}

pub(crate) fn serialize_xml<T: serde::Serialize>(value: &T) -> Result<String> {
    quick_xml::se::to_string(value).map_err(|e| TosError::XmlParse(e.to_string()))
}

pub(crate) fn header_etag_opt(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim_matches('"').to_string())
}
