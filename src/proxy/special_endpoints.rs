//! Response types and built-in endpoint handlers.
//!
//! - `/health` - liveness check
//! - `OPTIONS *` - CORS preflight
//! - error bodies for every failed request
//!
//! Functions return `GatewayResponse` instead of writing to a session, so
//! response generation stays testable without a running server.

use bytes::Bytes;

use crate::error::GatewayError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Methods advertised in preflight and 405 responses
pub const ALLOWED_METHODS: &str = "GET, OPTIONS";

/// Transport-neutral response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Extra headers besides Content-Type and Content-Length
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            headers: Vec::new(),
            body: Bytes::from(body),
        }
    }

    /// Transcoded image with its media type
    pub fn image(content_type: String, data: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            headers: Vec::new(),
            body: Bytes::from(data),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `GET /health`
pub fn handle_health() -> GatewayResponse {
    let body = serde_json::json!({ "status": "OK" }).to_string();
    GatewayResponse::json(200, body)
}

/// CORS preflight for any path
pub fn handle_preflight() -> GatewayResponse {
    GatewayResponse::empty(204)
        .with_header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .with_header("Access-Control-Allow-Headers", "*")
        .with_header("Access-Control-Max-Age", "600")
}

/// `{"status_code": ..., "detail": ...}` with the matching status
pub fn error_response(error: &GatewayError) -> GatewayResponse {
    let body = error.to_body();
    let response = GatewayResponse::json(body.status_code, body.to_json());
    match error {
        GatewayError::MethodNotAllowed => response.with_header("Allow", ALLOWED_METHODS),
        _ => response,
    }
}
