//! Client configuration with validation.

use std::env;
use std::time::Duration;

use ic_03_payment_flow::CheckoutConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Backend connection and checkout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined to
    pub api_url: String,
    /// Whole-request timeout
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Public key of the payment provider, passed to the widget
    pub provider_key: String,
    /// Balance required before a submission is attempted
    pub min_credits: u64,
    pub merchant_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            provider_key: String::new(),
            min_credits: 1,
            merchant_name: "Credit-Based Image Processing".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `IC_API_URL`: backend base URL (default: http://localhost:8000/api/v1)
    /// - `IC_REQUEST_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `IC_CONNECT_TIMEOUT_SECS`: connect timeout (default: 5)
    /// - `IC_PROVIDER_KEY` or `NEXT_PUBLIC_RAZORPAY_KEY_ID`: widget key
    /// - `IC_MIN_CREDITS`: submission threshold (default: 1)
    /// - `IC_MERCHANT_NAME`: checkout display name
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            api_url: lookup("IC_API_URL").unwrap_or(defaults.api_url),
            request_timeout_secs: number("IC_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            connect_timeout_secs: number("IC_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            provider_key: lookup("IC_PROVIDER_KEY")
                .or_else(|| lookup("NEXT_PUBLIC_RAZORPAY_KEY_ID"))
                .unwrap_or(defaults.provider_key),
            min_credits: number("IC_MIN_CREDITS", defaults.min_credits),
            merchant_name: lookup("IC_MERCHANT_NAME").unwrap_or(defaults.merchant_name),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidUrl("api_url cannot be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(format!(
                "api_url must use http or https: {url}"
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "connect timeout cannot be 0".into(),
            ));
        }

        if self.min_credits == 0 {
            return Err(ConfigError::InvalidLimit("min_credits cannot be 0".into()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Widget settings derived from this configuration.
    pub fn checkout(&self) -> CheckoutConfig {
        CheckoutConfig {
            key: self.provider_key.clone(),
            merchant_name: self.merchant_name.clone(),
            ..CheckoutConfig::default()
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
