//! Client configuration

use std::time::Duration;

use toolgate_types::DEFAULT_ANONYMOUS_LIMIT;

use crate::retry::RetryConfig;

/// Default local storage key for the anonymous usage counter
pub const DEFAULT_STORAGE_KEY: &str = "anonymous_tool_usage";

/// Default route of the pricing view
pub const DEFAULT_UPGRADE_ROUTE: &str = "/pricing";

/// Bearer credential for the entitlement server.
///
/// The raw token never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a bearer token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Entitlement client configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    endpoint: String,
    anonymous_limit: u32,
    storage_key: String,
    check_timeout: Duration,
    request_timeout: Duration,
    connect_timeout: Duration,
    retry: RetryConfig,
    plan_cache_ttl: Duration,
    upgrade_route: String,
}

impl GateConfig {
    /// Start building a configuration
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// `TOOLGATE_API_URL` is required. `TOOLGATE_ANONYMOUS_LIMIT`,
    /// `TOOLGATE_CHECK_TIMEOUT_MS` and `TOOLGATE_REQUEST_TIMEOUT_MS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            std::env::var("TOOLGATE_API_URL").map_err(|_| ConfigError::Missing("TOOLGATE_API_URL"))?;

        let mut builder = Self::builder().endpoint(endpoint);

        if let Ok(limit) = std::env::var("TOOLGATE_ANONYMOUS_LIMIT") {
            let limit = limit
                .parse()
                .map_err(|_| ConfigError::Invalid("TOOLGATE_ANONYMOUS_LIMIT"))?;
            builder = builder.anonymous_limit(limit);
        }

        if let Ok(ms) = std::env::var("TOOLGATE_CHECK_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| ConfigError::Invalid("TOOLGATE_CHECK_TIMEOUT_MS"))?;
            builder = builder.check_timeout(Duration::from_millis(ms));
        }

        if let Ok(ms) = std::env::var("TOOLGATE_REQUEST_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| ConfigError::Invalid("TOOLGATE_REQUEST_TIMEOUT_MS"))?;
            builder = builder.request_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Base URL of the entitlement server, without trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uses granted to anonymous visitors
    pub fn anonymous_limit(&self) -> u32 {
        self.anonymous_limit
    }

    /// Local storage key of the anonymous counter
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Deadline for an access check, retries included
    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    /// Deadline for a single non-check request
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Retry policy for access checks
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// How long a known pro plan short-circuits access checks
    pub fn plan_cache_ttl(&self) -> Duration {
        self.plan_cache_ttl
    }

    /// Route of the pricing view
    pub fn upgrade_route(&self) -> &str {
        &self.upgrade_route
    }
}

/// Builder for [`GateConfig`]
#[derive(Debug, Clone)]
pub struct GateConfigBuilder {
    endpoint: Option<String>,
    anonymous_limit: u32,
    storage_key: String,
    check_timeout: Duration,
    request_timeout: Duration,
    connect_timeout: Duration,
    retry: RetryConfig,
    plan_cache_ttl: Duration,
    upgrade_route: String,
}

impl Default for GateConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            anonymous_limit: DEFAULT_ANONYMOUS_LIMIT,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            check_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            plan_cache_ttl: Duration::from_secs(60),
            upgrade_route: DEFAULT_UPGRADE_ROUTE.to_string(),
        }
    }
}

impl GateConfigBuilder {
    /// Set the entitlement server base URL
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the anonymous usage limit
    #[must_use]
    pub fn anonymous_limit(mut self, limit: u32) -> Self {
        self.anonymous_limit = limit;
        self
    }

    /// Set the local storage key of the anonymous counter
    #[must_use]
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the access check deadline
    #[must_use]
    pub fn check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Set the per-request deadline
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the TCP connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the access check retry policy
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pro plan cache TTL
    #[must_use]
    pub fn plan_cache_ttl(mut self, ttl: Duration) -> Self {
        self.plan_cache_ttl = ttl;
        self
    }

    /// Set the pricing route
    #[must_use]
    pub fn upgrade_route(mut self, route: impl Into<String>) -> Self {
        self.upgrade_route = route.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<GateConfig, ConfigError> {
        let endpoint = self.endpoint.ok_or(ConfigError::Missing("endpoint"))?;
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();

        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid("storage_key"));
        }
        if self.check_timeout.is_zero() {
            return Err(ConfigError::Invalid("check_timeout"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout"));
        }

        Ok(GateConfig {
            endpoint,
            anonymous_limit: self.anonymous_limit,
            storage_key: self.storage_key,
            check_timeout: self.check_timeout,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            retry: self.retry,
            plan_cache_ttl: self.plan_cache_ttl,
            upgrade_route: self.upgrade_route,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for setting: {0}")]
    Invalid(&'static str),

    #[error("endpoint must be an http(s) URL: {0}")]
    InvalidEndpoint(String),
}
