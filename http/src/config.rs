//! HTTP strategy configuration

use std::time::Duration;

/// Maximum response size (50MB)
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 50 * 1024 * 1024;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by [`FetchStrategy`](crate::FetchStrategy) and [`JsonStrategy`](crate::JsonStrategy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStrategyConfig {
    timeout: Duration,
    max_response_bytes: usize,
    user_agent: String,
}

impl Default for HttpStrategyConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("karman/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpStrategyConfig {
    /// Per-request timeout enforced by the HTTP client
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Largest response body accepted
    #[must_use]
    pub const fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// `User-Agent` header value
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Largest response body accepted
    #[must_use]
    pub const fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    /// `User-Agent` header value
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
