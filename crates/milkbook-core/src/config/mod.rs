//! Runtime configuration for the sync engine.
//!
//! Values come from the environment (or any key lookup, for tests and front
//! ends with their own config files).

use std::time::Duration;

use thiserror::Error;

use crate::remote::{RemoteError, SheetsGateway};
use crate::util::{is_http_url, normalize_text_option};

pub const ENDPOINT_ENV: &str = "MILKBOOK_ENDPOINT";
pub const REQUEST_TIMEOUT_ENV: &str = "MILKBOOK_REQUEST_TIMEOUT_SECS";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Spreadsheet web app URL; `None` runs local-only
    pub endpoint: Option<String>,
    /// Upper bound on a single push or pull
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = normalize_text_option(lookup(ENDPOINT_ENV))
            .map(|endpoint| Self::validate_endpoint(ENDPOINT_ENV, &endpoint))
            .transpose()?;

        let request_timeout = match normalize_text_option(lookup(REQUEST_TIMEOUT_ENV)) {
            Some(raw) => Self::parse_timeout(REQUEST_TIMEOUT_ENV, &raw)?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            endpoint,
            request_timeout,
        })
    }

    /// Endpoint with the scheme checked and any trailing `/` removed
    pub fn validate_endpoint(key: &'static str, raw: &str) -> Result<String, ConfigError> {
        let endpoint = raw.trim();
        if is_http_url(endpoint) {
            Ok(endpoint.trim_end_matches('/').to_string())
        } else {
            Err(ConfigError::Invalid {
                key,
                reason: "endpoint must include http:// or https://".to_string(),
            })
        }
    }

    /// Positive whole number of seconds
    pub fn parse_timeout(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid {
                key,
                reason: format!("expected a positive number of seconds, got '{}'", raw.trim()),
            }),
        }
    }

    /// HTTP gateway for the configured endpoint, if there is one
    pub fn gateway(&self) -> Result<Option<SheetsGateway>, RemoteError> {
        self.endpoint
            .as_deref()
            .map(|endpoint| SheetsGateway::new(endpoint, self.request_timeout))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.gateway().unwrap().is_none());
    }

    #[test]
    fn reads_endpoint_and_timeout() {
        let config = SyncConfig::from_lookup(lookup(&[
            (ENDPOINT_ENV, " https://script.google.com/macros/s/abc/exec/ "),
            (REQUEST_TIMEOUT_ENV, "30"),
        ]))
        .unwrap();

        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://script.google.com/macros/s/abc/exec")
        );
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.gateway().unwrap().is_some());
    }

    #[test]
    fn blank_endpoint_means_local_only() {
        let config = SyncConfig::from_lookup(lookup(&[(ENDPOINT_ENV, "   ")])).unwrap();
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            SyncConfig::from_lookup(lookup(&[(ENDPOINT_ENV, "script.google.com")])),
            Err(ConfigError::Invalid { key: ENDPOINT_ENV, .. })
        ));
        assert!(matches!(
            SyncConfig::from_lookup(lookup(&[(REQUEST_TIMEOUT_ENV, "0")])),
            Err(ConfigError::Invalid { key: REQUEST_TIMEOUT_ENV, .. })
        ));
        assert!(matches!(
            SyncConfig::from_lookup(lookup(&[(REQUEST_TIMEOUT_ENV, "soon")])),
            Err(ConfigError::Invalid { key: REQUEST_TIMEOUT_ENV, .. })
        ));
    }
}
