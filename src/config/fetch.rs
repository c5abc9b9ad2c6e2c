//! Upstream fetch configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_SCHEMES, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_FILE_SIZE,
};
use crate::fetcher::{media_type_essence, FetchPolicy};

fn default_allowed_schemes() -> Vec<String> {
    DEFAULT_ALLOWED_SCHEMES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_content_types() -> Vec<String> {
    DEFAULT_ALLOWED_CONTENT_TYPES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
    /// Maximum upstream payload in bytes (default: 12400000)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            allowed_content_types: default_allowed_content_types(),
            max_file_size: default_max_file_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_schemes.is_empty() {
            return Err("fetch.allowed_schemes cannot be empty".to_string());
        }
        if self.allowed_schemes.iter().any(|s| s.trim().is_empty()) {
            return Err("fetch.allowed_schemes cannot contain empty entries".to_string());
        }
        if self.allowed_content_types.is_empty() {
            return Err("fetch.allowed_content_types cannot be empty".to_string());
        }
        if let Some(bad) = self
            .allowed_content_types
            .iter()
            .find(|t| !media_type_essence(t).contains('/'))
        {
            return Err(format!(
                "fetch.allowed_content_types entry '{}' is not a media type",
                bad
            ));
        }
        if self.max_file_size == 0 {
            return Err("fetch.max_file_size must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Lowercased policy consumed by the fetcher
    pub fn to_fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            allowed_schemes: self
                .allowed_schemes
                .iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .collect(),
            allowed_content_types: self
                .allowed_content_types
                .iter()
                .map(|t| media_type_essence(t))
                .collect(),
            max_size: self.max_file_size,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
