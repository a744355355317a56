use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.hh.ru";
pub const DEFAULT_USER_AGENT: &str = "vacancy-ingest/0.1 (ops@vacancy-ingest.local)";
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable client settings, fixed at construction.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Minimum spacing between two requests. Zero disables spacing.
    pub min_request_interval: Duration,
    access_token: String,
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_request_interval: interval_for(DEFAULT_REQUESTS_PER_MINUTE),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Space requests so that at most `rpm` are sent per minute.
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.min_request_interval = interval_for(rpm);
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

fn interval_for(rpm: u32) -> Duration {
    if rpm == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(60) / rpm
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .field("min_request_interval", &self.min_request_interval)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spacing_matches_rpm() {
        let config = ClientConfig::new("token");
        assert_eq!(config.min_request_interval, Duration::from_millis(500));

        let config = config.with_requests_per_minute(30);
        assert_eq!(config.min_request_interval, Duration::from_secs(2));

        let config = config.with_requests_per_minute(0);
        assert_eq!(config.min_request_interval, Duration::ZERO);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new("secret-token");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("REDACTED"));
    }
}
