//! Client configuration.

use std::time::Duration;

use passage_core::ApiUrl;

/// Default bound on an ordinary API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on the refresh network call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default bound on how long a caller waits for an in-flight refresh.
pub const DEFAULT_REFRESH_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for talking to the remote auth service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; endpoint paths are resolved against it.
    pub base_url: ApiUrl,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub refresh_wait_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration with default timeouts for the given base URL.
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            refresh_wait_timeout: DEFAULT_REFRESH_WAIT_TIMEOUT,
            user_agent: concat!("passage/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_refresh_wait_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_wait_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
