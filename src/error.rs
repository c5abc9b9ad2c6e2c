// Error types module

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetcher::FetchError;
use crate::transcoder::{DirectiveError, TranscodeError};

/// Centralized error type for the gateway
///
/// Wraps the stage errors of the pipeline and adds the failures that only
/// the request handler can detect. `to_http_status` is the single place
/// where failures become status codes.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Directive segment could not be tokenized
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    /// Target resolution or upstream fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Decode, resize or encode failed
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    /// Request path lacks the directive or target segment
    #[error("Missing required fields.")]
    MalformedRequest,

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Anything unexpected; the message is logged but never returned
    #[error("Invalid URL")]
    Internal { message: String },
}

impl GatewayError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            GatewayError::Directive(e) => e.to_http_status(),
            GatewayError::Fetch(e) => match e {
                // Never leak client construction details
                FetchError::ClientInit { .. } => 422,
                other => other.to_http_status(),
            },
            GatewayError::Transcode(e) => e.to_http_status(),
            GatewayError::MalformedRequest => 400,
            GatewayError::NotFound => 404,
            GatewayError::MethodNotAllowed => 405,
            GatewayError::Internal { .. } => 422,
        }
    }

    /// Client-facing detail string
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Fetch(FetchError::ClientInit { .. })
            | GatewayError::Transcode(TranscodeError::ResizeFailed { .. })
            | GatewayError::Transcode(TranscodeError::EncodeFailed { .. }) => {
                "Invalid URL".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Underlying cause that `detail` hides from the client, for the log
    pub fn hidden_cause(&self) -> Option<String> {
        match self {
            GatewayError::Internal { message } => Some(message.clone()),
            GatewayError::Fetch(FetchError::ClientInit { message })
            | GatewayError::Fetch(FetchError::UpstreamUnreachable { message }) => {
                Some(message.clone())
            }
            GatewayError::Transcode(
                e @ (TranscodeError::ResizeFailed { .. } | TranscodeError::EncodeFailed { .. }),
            ) => Some(e.to_string()),
            _ => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal {
            message: message.into(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.to_http_status(),
            detail: self.detail(),
        }
    }
}

/// JSON error body: `{"status_code": 400, "detail": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub detail: String,
}

impl ErrorBody {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"status_code":{},"detail":"Invalid URL"}}"#,
                self.status_code
            )
        })
    }
}
