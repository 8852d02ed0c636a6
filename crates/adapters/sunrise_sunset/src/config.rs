//! Sunrise-sunset API configuration.

use serde::Deserialize;

/// Public endpoint of the sunrise-sunset.org API.
pub const DEFAULT_API_URL: &str = "https://api.sunrise-sunset.org/json";

/// Configuration for the sunrise-sunset client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SunriseSunsetConfig {
    /// Endpoint queried with `lat`, `lng`, `date` and `formatted=0`.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SunriseSunsetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
        }
    }
}
