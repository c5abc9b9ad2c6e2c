//! Per-request access log.
//!
//! A [`RequestLogger`] is built once from config and injected into the
//! handler. It opens one [`RequestLog`] per request; finishing the log
//! emits a structured event and returns the [`AccessRecord`] so callers
//! and tests can inspect exactly what was written.

use std::time::{Duration, Instant};

use crate::config::LoggingConfig;

/// What was logged for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub host: Option<String>,
    pub status: u16,
    /// Response body size in bytes
    pub size: usize,
    pub elapsed_ms: f64,
    /// Client-facing detail of a failed request
    pub error: Option<String>,
}

/// Factory for request-scoped logs.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    disabled: bool,
    excluded_host: String,
}

impl RequestLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            disabled: config.disabled,
            excluded_host: config.excluded_host.to_ascii_lowercase(),
        }
    }

    /// Logger that never records anything
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            excluded_host: String::new(),
        }
    }

    /// Start timing a request.
    pub fn begin(&self, method: &str, url: &str, host: Option<&str>) -> RequestLog {
        let enabled = !self.disabled && !host.map_or(false, |h| self.is_excluded(h));
        RequestLog {
            request_id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            url: url.to_string(),
            host: host.map(str::to_string),
            started: Instant::now(),
            enabled,
        }
    }

    fn is_excluded(&self, host: &str) -> bool {
        if self.excluded_host.is_empty() {
            return false;
        }
        let host = host.trim().to_ascii_lowercase();
        let hostname = host.rsplit_once(':').map_or(host.as_str(), |(name, port)| {
            if port.chars().all(|c| c.is_ascii_digit()) {
                name
            } else {
                host.as_str()
            }
        });
        hostname == self.excluded_host
    }
}

/// An in-flight request's log entry.
#[derive(Debug)]
pub struct RequestLog {
    request_id: String,
    method: String,
    url: String,
    host: Option<String>,
    started: Instant,
    enabled: bool,
}

impl RequestLog {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Emit the access line. Returns `None` when the request is not logged.
    pub fn finish(self, status: u16, size: usize, error: Option<&str>) -> Option<AccessRecord> {
        if !self.enabled {
            return None;
        }

        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let record = AccessRecord {
            request_id: self.request_id,
            method: self.method,
            url: self.url,
            host: self.host,
            status,
            size,
            elapsed_ms,
            error: error.map(str::to_string),
        };

        tracing::info!(
            request_id = %record.request_id,
            method = %record.method,
            url = %record.url,
            host = record.host.as_deref().unwrap_or("-"),
            status = record.status,
            size = record.size,
            elapsed_ms = record.elapsed_ms,
            "Request completed"
        );

        if let Some(detail) = &record.error {
            tracing::error!(
                request_id = %record.request_id,
                method = %record.method,
                url = %record.url,
                status = record.status,
                detail = %detail,
                "Request failed"
            );
        }

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> RequestLogger {
        RequestLogger::new(&LoggingConfig::default())
    }

    #[test]
    fn test_finish_returns_record() {
        let log = logger().begin("GET", "/format(png)/https://example.com/a.jpg", Some("img.local"));
        let id = log.request_id().to_string();
        let record = log.finish(200, 1234, None).unwrap();

        assert_eq!(record.request_id, id);
        assert_eq!(record.method, "GET");
        assert_eq!(record.url, "/format(png)/https://example.com/a.jpg");
        assert_eq!(record.host.as_deref(), Some("img.local"));
        assert_eq!(record.status, 200);
        assert_eq!(record.size, 1234);
        assert!(record.elapsed_ms >= 0.0);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failures_carry_detail() {
        let record = logger()
            .begin("GET", "/format(txt)/x", None)
            .finish(400, 80, Some("Unsupported media type"))
            .unwrap();
        assert_eq!(record.error.as_deref(), Some("Unsupported media type"));
    }

    #[test]
    fn test_excluded_host_is_not_logged() {
        let logger = logger();
        assert!(logger.begin("GET", "/", Some("testserver")).finish(404, 0, None).is_none());
        assert!(logger.begin("GET", "/", Some("TestServer:80")).finish(404, 0, None).is_none());
        assert!(logger.begin("GET", "/", Some("testserver.example")).is_enabled());
    }

    #[test]
    fn test_disabled_logger_records_nothing() {
        let config = LoggingConfig {
            disabled: true,
            ..LoggingConfig::default()
        };
        let log = RequestLogger::new(&config).begin("GET", "/health", Some("img.local"));
        assert!(!log.is_enabled());
        assert!(log.finish(200, 15, None).is_none());

        assert!(RequestLogger::disabled()
            .begin("GET", "/", None)
            .finish(200, 0, None)
            .is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let logger = logger();
        let a = logger.begin("GET", "/", None);
        let b = logger.begin("GET", "/", None);
        assert_ne!(a.request_id(), b.request_id());
    }
}
