//! Access log configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXCLUDED_LOG_HOST;

fn default_excluded_host() -> String {
    DEFAULT_EXCLUDED_LOG_HOST.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Turn the per-request access log off entirely
    #[serde(default)]
    pub disabled: bool,
    /// Requests with this `Host` are never logged (default: `testserver`)
    #[serde(default = "default_excluded_host")]
    pub excluded_host: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            excluded_host: default_excluded_host(),
        }
    }
}
