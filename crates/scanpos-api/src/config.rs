//! The `[api]` section of the terminal's config file.
//!
//! ```toml
//! [api]
//! base_url = "https://pos.example.com"
//! timeout_secs = 10
//! ```
//!
//! Environment overrides: `SCANPOS_API_URL`, `SCANPOS_API_TIMEOUT_SECS`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiClientError, ApiResult};

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Root URL of the store backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses the base URL, rejecting anything but http(s).
    pub fn parsed_base_url(&self) -> ApiResult<Url> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ApiClientError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, self.base_url
                )))
            }
        }
        if url.cannot_be_a_base() {
            return Err(ApiClientError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                self.base_url
            )));
        }
        Ok(url)
    }

    pub fn validate(&self) -> ApiResult<()> {
        self.parsed_base_url()?;
        if self.timeout_secs == 0 {
            return Err(ApiClientError::InvalidUrl(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `SCANPOS_API_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCANPOS_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.base_url = url;
        }
        if let Some(value) = lookup("SCANPOS_API_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid SCANPOS_API_TIMEOUT_SECS"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ApiSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let settings = ApiSettings {
            base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ApiClientError::InvalidUrl(_))));

        let settings = ApiSettings {
            base_url: "mailto:pos@example.com".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ApiSettings {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut settings = ApiSettings::default();
        settings.apply_overrides(|key| match key {
            "SCANPOS_API_URL" => Some("https://pos.example.com/api".into()),
            "SCANPOS_API_TIMEOUT_SECS" => Some("x".into()),
            _ => None,
        });
        assert_eq!(settings.base_url, "https://pos.example.com/api");
        assert_eq!(settings.timeout_secs, 10);
    }
}
