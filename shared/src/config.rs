//! Console configuration handed to the core by the shell at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::http::{ValidatedUrl, MAX_TIMEOUT_MS};
use crate::{AppError, ErrorKind};

pub const DEFAULT_API_BASE_URL: &str = "https://liveapi.sattalives.com/api/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
pub const MAX_POLL_INTERVAL_MS: u64 = 60 * 60 * 1000;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid API base URL: {reason}")]
    InvalidBaseUrl { reason: String },

    #[error(
        "poll interval {millis}ms must be between {}ms and {}ms",
        MIN_POLL_INTERVAL_MS,
        MAX_POLL_INTERVAL_MS
    )]
    PollInterval { millis: u64 },

    #[error("request timeout {millis}ms must be between 1ms and {}ms", MAX_TIMEOUT_MS)]
    RequestTimeout { millis: u64 },

    #[error("page size {size} must be between 1 and {}", MAX_PAGE_SIZE)]
    PageSize { size: u32 },
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorKind::Internal, "The console is misconfigured.")
            .with_internal(err.to_string())
            .with_action("start the console")
    }
}

/// Raw configuration as the shell sends it. Missing fields take the
/// production defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub page_size: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let mut base = self.api_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = ValidatedUrl::new(base).map_err(|e| ConfigError::InvalidBaseUrl {
            reason: e.to_string(),
        })?;
        if api_base.as_str().contains('?') || api_base.as_str().contains('#') {
            return Err(ConfigError::InvalidBaseUrl {
                reason: "base URL cannot carry a query or fragment".to_string(),
            });
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::PollInterval {
                millis: self.poll_interval_ms,
            });
        }

        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::RequestTimeout {
                millis: self.request_timeout_ms,
            });
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize {
                size: self.page_size,
            });
        }

        Ok(Settings {
            api_base,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            page_size: self.page_size,
        })
    }
}

/// Validated configuration used at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: ValidatedUrl,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = ConsoleConfig::default().validate().unwrap();
        assert_eq!(settings.api_base.as_str(), DEFAULT_API_BASE_URL);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.page_size, 10);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ConsoleConfig {
            api_base_url: "https://staging.example.com/api".into(),
            ..ConsoleConfig::default()
        };
        let settings = config.validate().unwrap();
        assert_eq!(settings.api_base.as_str(), "https://staging.example.com/api/");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_url = ConsoleConfig {
            api_base_url: "ftp://files.example.com".into(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        let with_query = ConsoleConfig {
            api_base_url: "https://example.com/api/?x=1".into(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            with_query.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        let fast_poll = ConsoleConfig {
            poll_interval_ms: 10,
            ..ConsoleConfig::default()
        };
        assert_eq!(
            fast_poll.validate(),
            Err(ConfigError::PollInterval { millis: 10 })
        );

        let no_timeout = ConsoleConfig {
            request_timeout_ms: 0,
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            no_timeout.validate(),
            Err(ConfigError::RequestTimeout { .. })
        ));

        let huge_page = ConsoleConfig {
            page_size: 1000,
            ..ConsoleConfig::default()
        };
        assert_eq!(
            huge_page.validate(),
            Err(ConfigError::PageSize { size: 1000 })
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ConsoleConfig =
            serde_json::from_str(r#"{"api_base_url":"https://example.com/api/"}"#).unwrap();
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }
}
