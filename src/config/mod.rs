// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::fetcher::FetchPolicy;
use crate::transcoder::OutputPolicy;

pub mod fetch;
pub mod logging;
pub mod server;
pub mod transcode;

pub use fetch::FetchConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;
pub use transcode::TranscodeConfig;

/// Gateway configuration document
///
/// Every section has defaults, so an empty document is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.address.trim().is_empty() {
            return Err("server.address cannot be empty".to_string());
        }
        self.fetch.validate()?;
        self.transcode.validate()?;
        Ok(())
    }

    /// Policy handed to the source fetcher
    pub fn fetch_policy(&self) -> FetchPolicy {
        self.fetch.to_fetch_policy()
    }

    /// Policy handed to the transcoder
    ///
    /// Rejections of an output format list the accepted input media types.
    pub fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::new(
            self.transcode.allowed_output_formats.clone(),
            self.transcode.default_format.clone(),
            self.transcode.webp_default_quality,
            self.fetch_policy().allowed_content_types,
        )
    }
}
