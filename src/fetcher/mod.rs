//! Source image fetcher.
//!
//! Retrieves the bytes of a client-supplied target URL while enforcing the
//! admission policy: allowed schemes, allow-listed content types, and a
//! declared length no larger than the configured maximum.
//!
//! # Example
//!
//! ```ignore
//! use imgate::fetcher::{FetchPolicy, SourceFetcher};
//!
//! let fetcher = SourceFetcher::new(FetchPolicy::default())?;
//! let source = fetcher.resolve("https://example.com/photo.jpg", None, None)?;
//! let fetched = fetcher.fetch(&source).await?;
//! ```

pub mod error;
pub mod size;

pub use error::FetchError;
pub use size::pretty_size;

use bytes::{Bytes, BytesMut};
use image::ImageFormat;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Url;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_SCHEMES, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_FILE_SIZE, VENDOR_LENGTH_HEADER,
};

/// Admission rules applied before and during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Lowercase URL schemes a target may use.
    pub allowed_schemes: Vec<String>,
    /// Lowercase MIME essences the upstream may declare.
    pub allowed_content_types: Vec<String>,
    /// Largest accepted payload in bytes.
    pub max_size: u64,
    /// Whole-request timeout, body included.
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            allowed_schemes: DEFAULT_ALLOWED_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_size: DEFAULT_MAX_FILE_SIZE,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl FetchPolicy {
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.to_ascii_lowercase();
        self.allowed_schemes.iter().any(|s| *s == scheme)
    }

    /// Compare by MIME essence: parameters after `;` are ignored.
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        let essence = media_type_essence(content_type);
        self.allowed_content_types.iter().any(|t| *t == essence)
    }

    pub fn allowed_schemes_display(&self) -> String {
        self.allowed_schemes.join(", ")
    }

    pub fn allowed_content_types_display(&self) -> String {
        self.allowed_content_types.join(", ")
    }
}

/// A validated fetch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: Url,
    /// Caller's User-Agent, forwarded verbatim
    pub user_agent: Option<String>,
}

impl SourceDescriptor {
    /// `scheme://host` of the target, sent as both Origin and Referer.
    pub fn origin(&self) -> String {
        format!(
            "{}://{}",
            self.url.scheme(),
            self.url.host_str().unwrap_or_default()
        )
    }
}

/// Bytes fetched from upstream plus what the upstream said about them.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub data: Bytes,
    /// Content-Type exactly as the upstream sent it
    pub content_type: String,
    /// Declared length that passed the size check
    pub declared_length: u64,
    /// Format sniffed from the payload's magic bytes
    pub detected_format: Option<ImageFormat>,
}

/// HTTP fetcher for source images.
#[derive(Clone)]
pub struct SourceFetcher {
    policy: FetchPolicy,
    http_client: reqwest::Client,
}

impl SourceFetcher {
    /// Create a new fetcher with the given policy.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ClientInit` if the HTTP client cannot be created.
    pub fn new(policy: FetchPolicy) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| FetchError::ClientInit {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            policy,
            http_client,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Turn the raw target text of a request into a validated source.
    ///
    /// `raw_target` is percent-decoded once; `raw_query` is appended verbatim.
    ///
    /// # Errors
    ///
    /// - `InvalidTarget` if nothing remains after decoding
    /// - `UnsupportedScheme` if the scheme is absent or not allowed
    /// - `InvalidUrl` if the scheme is allowed but the URL does not parse
    pub fn resolve(
        &self,
        raw_target: &str,
        raw_query: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<SourceDescriptor, FetchError> {
        let target = build_target(raw_target, raw_query);
        if target.is_empty() {
            return Err(FetchError::InvalidTarget {
                allowed: self.policy.allowed_content_types_display(),
            });
        }

        let url = match Url::parse(&target) {
            Ok(url) => url,
            Err(e) => {
                let scheme_allowed = target
                    .split_once(':')
                    .map(|(scheme, _)| self.policy.allows_scheme(scheme))
                    .unwrap_or(false);
                if scheme_allowed {
                    return Err(FetchError::InvalidUrl {
                        reason: e.to_string(),
                    });
                }
                return Err(self.unsupported_scheme());
            }
        };

        if !self.policy.allows_scheme(url.scheme()) {
            return Err(self.unsupported_scheme());
        }

        Ok(SourceDescriptor {
            url,
            user_agent: user_agent.map(str::to_string),
        })
    }

    /// Fetch the source bytes.
    ///
    /// The upstream status code is not inspected; error pages are rejected
    /// by the content-type check.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnreachable` on connection failure or timeout
    /// - `UnsupportedMediaType` if the content type is missing or not allowed
    /// - `SizeUndeterminable` if no usable length header is present
    /// - `PayloadTooLarge` if the declared or received size exceeds the maximum
    pub async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
        let origin = source.origin();
        let mut request = self
            .http_client
            .get(source.url.clone())
            .header(ORIGIN, origin.as_str())
            .header(REFERER, origin.as_str());
        if let Some(user_agent) = &source.user_agent {
            request = request.header(USER_AGENT, user_agent.as_str());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| FetchError::upstream_unreachable(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = match content_type {
            Some(ct) if self.policy.allows_content_type(&ct) => ct,
            other => {
                return Err(FetchError::UnsupportedMediaType {
                    content_type: other,
                    allowed: self.policy.allowed_content_types_display(),
                })
            }
        };

        let declared_length =
            declared_length(response.headers()).ok_or(FetchError::SizeUndeterminable)?;
        if declared_length > self.policy.max_size {
            return Err(FetchError::payload_too_large(self.policy.max_size));
        }

        // Upstreams can lie about their length, so the body is capped too
        let max_size = self.policy.max_size;
        let mut buffer = BytesMut::with_capacity(declared_length as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::upstream_unreachable(e.to_string()))?
        {
            if (buffer.len() + chunk.len()) as u64 > max_size {
                return Err(FetchError::payload_too_large(max_size));
            }
            buffer.extend_from_slice(&chunk);
        }
        let data = buffer.freeze();

        tracing::debug!(
            url = %source.url,
            content_type = %content_type,
            declared_length,
            received = data.len(),
            "Fetched source image"
        );

        Ok(FetchResult {
            detected_format: image::guess_format(&data).ok(),
            data,
            content_type,
            declared_length,
        })
    }

    fn unsupported_scheme(&self) -> FetchError {
        FetchError::UnsupportedScheme {
            allowed: self.policy.allowed_schemes_display(),
        }
    }
}

/// Rebuild the target URL from the request path remainder and raw query.
pub fn build_target(raw_target: &str, raw_query: Option<&str>) -> String {
    let decoded = urlencoding::decode_binary(raw_target.as_bytes());
    let mut target = String::from_utf8_lossy(&decoded).into_owned();
    if let Some(query) = raw_query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Declared payload length: Content-Length, else the vendor length header.
///
/// A value that is not a non-negative integer counts as absent.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };
    parse(CONTENT_LENGTH.as_str()).or_else(|| parse(VENDOR_LENGTH_HEADER))
}

/// Lowercased MIME type without parameters.
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
