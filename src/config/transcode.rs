//! Output encoding configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALLOWED_OUTPUT_FORMATS, DEFAULT_OUTPUT_FORMAT, DEFAULT_WEBP_QUALITY,
};
use crate::transcoder::{normalize_format_name, OutputFormat};

fn default_allowed_output_formats() -> Vec<String> {
    DEFAULT_ALLOWED_OUTPUT_FORMATS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

fn default_webp_quality() -> u8 {
    DEFAULT_WEBP_QUALITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Format names a client may request; `JPG` is an alias of `JPEG`
    #[serde(default = "default_allowed_output_formats")]
    pub allowed_output_formats: Vec<String>,
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_webp_quality")]
    pub webp_default_quality: u8,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            allowed_output_formats: default_allowed_output_formats(),
            default_format: default_format(),
            webp_default_quality: default_webp_quality(),
        }
    }
}

impl TranscodeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_output_formats.is_empty() {
            return Err("transcode.allowed_output_formats cannot be empty".to_string());
        }

        for name in &self.allowed_output_formats {
            let normalized = normalize_format_name(name);
            if OutputFormat::from_name(&normalized).is_none() {
                return Err(format!(
                    "transcode.allowed_output_formats: '{}' cannot be encoded. Supported: JPG, JPEG, PNG, WEBP",
                    name
                ));
            }
        }

        let default = normalize_format_name(&self.default_format);
        let default_allowed = self
            .allowed_output_formats
            .iter()
            .any(|f| normalize_format_name(f) == default);
        if !default_allowed {
            return Err(format!(
                "transcode.default_format '{}' is not in allowed_output_formats",
                self.default_format
            ));
        }

        if self.webp_default_quality > 100 {
            return Err(format!(
                "transcode.webp_default_quality must be 0-100, got {}",
                self.webp_default_quality
            ));
        }

        Ok(())
    }
}
