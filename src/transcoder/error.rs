//! Transcoding error types
//!
//! Provides structured error handling with HTTP status mapping, one enum per
//! stage: directive parsing and decode/resize/encode.

use thiserror::Error;

/// Errors raised while tokenizing the directive segment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// A `(` inside a value, or a second parenthesized group
    #[error("Invalid directive '{token}': nested parentheses are not allowed")]
    Nested { token: String },

    /// A `(` without its closing `)` or a stray `)`
    #[error("Invalid directive '{token}': unbalanced parentheses")]
    Unbalanced { token: String },
}

impl DirectiveError {
    /// Every malformed directive is a client error
    pub fn to_http_status(&self) -> u16 {
        400
    }
}

/// Errors that can occur while decoding, transforming or encoding an image
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    /// Payload could not be decoded (corrupt data or a format with no decoder)
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: String },

    /// Requested output format is outside the allow-list.
    ///
    /// The detail enumerates the accepted *input* media types, which is what
    /// clients of the gateway have always been shown for this failure.
    #[error("Unsupported media type. (Only support: {allowed})")]
    UnsupportedOutputFormat { format: String, allowed: String },

    /// Source image is animated (GIF, animated WebP)
    #[error("Unsupported media type")]
    AnimatedSource { format: String },

    /// Resize operation failed
    #[error("Resize failed: {message}")]
    ResizeFailed { message: String },

    /// Encoding to output format failed
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed { format: String, message: String },
}

impl TranscodeError {
    /// Maps transcode errors to HTTP status codes
    ///
    /// Status mapping:
    /// - DecodeFailed → 422 (Unprocessable Entity)
    /// - UnsupportedOutputFormat, AnimatedSource → 400 (Bad Request)
    /// - ResizeFailed, EncodeFailed → 422 (backend message is logged, not returned)
    pub fn to_http_status(&self) -> u16 {
        match self {
            TranscodeError::DecodeFailed { .. } => 422,
            TranscodeError::UnsupportedOutputFormat { .. } | TranscodeError::AnimatedSource { .. } => {
                400
            }
            TranscodeError::ResizeFailed { .. } | TranscodeError::EncodeFailed { .. } => 422,
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        TranscodeError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        TranscodeError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        TranscodeError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failed_display() {
        let err = TranscodeError::decode_failed("invalid header");
        assert_eq!(err.to_string(), "Failed to decode image: invalid header");
        assert_eq!(err.to_http_status(), 422);
    }

    #[test]
    fn test_unsupported_output_format_lists_allowed_types() {
        let err = TranscodeError::UnsupportedOutputFormat {
            format: "TXT".to_string(),
            allowed: "image/png, image/jpeg".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported media type. (Only support: image/png, image/jpeg)"
        );
        assert_eq!(err.to_http_status(), 400);
    }

    #[test]
    fn test_animated_source_is_bad_request() {
        let err = TranscodeError::AnimatedSource {
            format: "gif".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported media type");
        assert_eq!(err.to_http_status(), 400);
    }

    #[test]
    fn test_encode_failed_display() {
        let err = TranscodeError::encode_failed("webp", "encoder error");
        assert_eq!(err.to_string(), "Failed to encode to webp: encoder error");
        assert_eq!(err.to_http_status(), 422);
    }

    #[test]
    fn test_directive_error_display() {
        let err = DirectiveError::Unbalanced {
            token: "size(1,2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid directive 'size(1,2': unbalanced parentheses"
        );
        assert_eq!(err.to_http_status(), 400);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TranscodeError>();
        assert_send_sync::<DirectiveError>();
    }
}
