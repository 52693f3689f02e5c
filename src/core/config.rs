//! Client configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{Result, ZabanError};

/// Default API endpoint
const DEFAULT_BASE_URL: &str = "https://api.zaban.ai";

/// Default concurrency limit for batch dispatch
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default per-request timeout in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Configuration for the Zaban client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_concurrent: usize,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ZABAN_API_KEY").unwrap_or_default(),
            base_url: std::env::var("ZABAN_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Build a configuration with an explicit API key and defaults elsewhere
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ZABAN_API_KEY").map_err(|_| ZabanError::Config {
            message: "ZABAN_API_KEY environment variable is required".to_string(),
        })?;

        let base_url = std::env::var("ZABAN_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let max_concurrent = std::env::var("ZABAN_MAX_CONCURRENT")
            .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT.to_string())
            .parse::<usize>()
            .map_err(|e| ZabanError::Config {
                message: format!("invalid ZABAN_MAX_CONCURRENT: {}", e),
            })?;

        let timeout_ms = std::env::var("ZABAN_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
            .parse::<u64>()
            .map_err(|e| ZabanError::Config {
                message: format!("invalid ZABAN_TIMEOUT_MS: {}", e),
            })?;

        debug!(
            "Loaded config: base_url={}, max_concurrent={}, timeout_ms={}",
            base_url, max_concurrent, timeout_ms
        );

        Ok(Self {
            api_key,
            base_url,
            max_concurrent,
            timeout_ms,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ZabanError::Config {
                message: "API key is required".to_string(),
            });
        }

        if self.base_url.is_empty() {
            return Err(ZabanError::Config {
                message: "base URL is required".to_string(),
            });
        }

        if self.max_concurrent == 0 {
            return Err(ZabanError::Config {
                message: "max_concurrent must be greater than 0".to_string(),
            });
        }

        if self.timeout_ms == 0 {
            return Err(ZabanError::Config {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Full URL for an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
