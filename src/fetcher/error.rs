//! Error types for source fetching

use thiserror::Error;

use super::size::pretty_size;

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Decoded target is empty
    #[error("Unsupported media type. (Only support: {allowed})")]
    InvalidTarget { allowed: String },

    #[error("Unsupported scheme. (Only support: {allowed})")]
    UnsupportedScheme { allowed: String },

    /// Target has an allowed scheme but is not a valid URL
    #[error("Invalid URL")]
    InvalidUrl { reason: String },

    /// Connection failure or timeout; the cause stays out of the detail
    #[error("Upstream unreachable")]
    UpstreamUnreachable { message: String },

    /// Upstream content type is missing or not allow-listed
    #[error("Unsupported media type. (Only support: {allowed})")]
    UnsupportedMediaType {
        content_type: Option<String>,
        allowed: String,
    },

    #[error("Can not detect file size, please try another image url!")]
    SizeUndeterminable,

    #[error("Max file size is {limit}")]
    PayloadTooLarge { max_size: u64, limit: String },

    /// HTTP client could not be built
    #[error("HTTP client error: {message}")]
    ClientInit { message: String },
}

impl FetchError {
    /// Maps fetch errors to HTTP status codes
    ///
    /// Status mapping:
    /// - InvalidTarget, UnsupportedMediaType → 403 (Forbidden)
    /// - UnsupportedScheme → 400 (Bad Request)
    /// - InvalidUrl → 422 (Unprocessable Entity)
    /// - SizeUndeterminable, PayloadTooLarge → 413 (Payload Too Large)
    /// - UpstreamUnreachable → 502 (Bad Gateway)
    /// - ClientInit → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            FetchError::InvalidTarget { .. } | FetchError::UnsupportedMediaType { .. } => 403,
            FetchError::UnsupportedScheme { .. } => 400,
            FetchError::InvalidUrl { .. } => 422,
            FetchError::SizeUndeterminable | FetchError::PayloadTooLarge { .. } => 413,
            FetchError::UpstreamUnreachable { .. } => 502,
            FetchError::ClientInit { .. } => 500,
        }
    }

    pub fn payload_too_large(max_size: u64) -> Self {
        FetchError::PayloadTooLarge {
            max_size,
            limit: pretty_size(max_size),
        }
    }

    pub fn upstream_unreachable(message: impl Into<String>) -> Self {
        FetchError::UpstreamUnreachable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_scheme_display() {
        let err = FetchError::UnsupportedScheme {
            allowed: "http, https".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported scheme. (Only support: http, https)"
        );
        assert_eq!(err.to_http_status(), 400);
    }

    #[test]
    fn test_payload_too_large_uses_pretty_size() {
        let err = FetchError::payload_too_large(12_400_000);
        assert_eq!(err.to_string(), "Max file size is 11 MB");
        assert_eq!(err.to_http_status(), 413);
    }

    #[test]
    fn test_size_undeterminable() {
        let err = FetchError::SizeUndeterminable;
        assert_eq!(
            err.to_string(),
            "Can not detect file size, please try another image url!"
        );
        assert_eq!(err.to_http_status(), 413);
    }

    #[test]
    fn test_fetch_stage_media_type_is_forbidden() {
        let err = FetchError::UnsupportedMediaType {
            content_type: Some("text/html".to_string()),
            allowed: "image/png".to_string(),
        };
        assert_eq!(err.to_http_status(), 403);
        assert_eq!(FetchError::InvalidTarget { allowed: String::new() }.to_http_status(), 403);
    }

    #[test]
    fn test_invalid_url_hides_reason() {
        let err = FetchError::InvalidUrl {
            reason: "invalid international domain name".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid URL");
        assert_eq!(err.to_http_status(), 422);
    }

    #[test]
    fn test_upstream_unreachable_is_bad_gateway() {
        let err = FetchError::upstream_unreachable("connect to http://10.1.2.3/a.png timed out");
        assert_eq!(err.to_http_status(), 502);
        assert_eq!(err.to_string(), "Upstream unreachable");
    }
}
