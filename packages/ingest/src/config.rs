use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use hh_client::config::{DEFAULT_BASE_URL, DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_REQUEST_TIMEOUT};
use hh_client::ClientConfig;

use crate::error::{IngestError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://vacancies.db";

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    /// Only `ingest` needs it; `init`, `stats` and friends run without one.
    pub access_token: Option<String>,
    pub base_url: String,
    pub user_agent: Option<String>,
    pub requests_per_minute: u32,
    pub request_timeout: Duration,
    pub database_url: String,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("request_timeout", &self.request_timeout)
            .field("database_url", &self.database_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through a variable lookup.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = RetryPolicy::default();

        Ok(Self {
            access_token: get("HH_ACCESS_TOKEN").filter(|token| !token.trim().is_empty()),
            base_url: get("HH_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_agent: get("HH_USER_AGENT"),
            requests_per_minute: parse_or(
                &get,
                "HH_REQUESTS_PER_MINUTE",
                DEFAULT_REQUESTS_PER_MINUTE,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "HH_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )?),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            retry: RetryPolicy {
                max_attempts: parse_or(&get, "INGEST_MAX_ATTEMPTS", defaults.max_attempts)?.max(1),
                initial_backoff: Duration::from_millis(parse_or(
                    &get,
                    "INGEST_BACKOFF_MS",
                    defaults.initial_backoff.as_millis() as u64,
                )?),
                max_backoff: Duration::from_millis(parse_or(
                    &get,
                    "INGEST_MAX_BACKOFF_MS",
                    defaults.max_backoff.as_millis() as u64,
                )?),
                rate_limit_backoff: Duration::from_secs(parse_or(
                    &get,
                    "INGEST_RATE_LIMIT_BACKOFF_SECS",
                    defaults.rate_limit_backoff.as_secs(),
                )?),
            },
        })
    }

    /// HTTP client settings. Fails when no access token is configured.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| IngestError::Config("HH_ACCESS_TOKEN must be set".into()))?;

        let mut config = ClientConfig::new(token)
            .with_base_url(&self.base_url)
            .with_timeout(self.request_timeout)
            .with_requests_per_minute(self.requests_per_minute);
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        Ok(config)
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            IngestError::Config(format!("{} must be a valid number, got {:?}", name, raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.base_url, "https://api.hh.ru");
        assert_eq!(config.database_url, "sqlite://vacancies.db");
        assert_eq!(config.requests_per_minute, 120);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.rate_limit_backoff, Duration::from_secs(8));
        assert!(config.access_token.is_none());
        assert!(config.client_config().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HH_ACCESS_TOKEN", "secret"),
            ("HH_REQUESTS_PER_MINUTE", "60"),
            ("INGEST_MAX_ATTEMPTS", "5"),
            ("INGEST_BACKOFF_MS", "250"),
            ("DATABASE_URL", "sqlite://other.db"),
        ])
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.database_url, "sqlite://other.db");

        let client = config.client_config().unwrap();
        assert_eq!(client.access_token(), "secret");
        assert_eq!(client.min_request_interval, Duration::from_secs(1));
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_bad_number() {
        let err = config_from(&[("HH_REQUESTS_PER_MINUTE", "fast")]).unwrap_err();
        assert!(err.to_string().contains("HH_REQUESTS_PER_MINUTE"));
    }
}
