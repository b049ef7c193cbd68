//! Configuration for the Entitlement API service.

use std::time::Duration;

use toolgate_types::DEFAULT_FREE_LIMIT;

/// Minimum length of the token signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Entitlement API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,

    /// Tool uses granted to free accounts
    pub free_tool_limit: u32,

    /// Lifetime of tokens issued by this service
    pub token_ttl: Duration,

    /// Request timeout for API routes
    pub request_timeout: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("jwt_secret", &"[REDACTED]")
            .field("free_tool_limit", &self.free_tool_limit)
            .field("token_ttl", &self.token_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Config {
    /// Configuration with defaults and the given secret
    pub fn new(jwt_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "JWT_SECRET must be at least 32 characters",
            ));
        }

        Ok(Self {
            http_port: 8080,
            jwt_secret,
            free_tool_limit: DEFAULT_FREE_LIMIT,
            token_ttl: Duration::from_secs(24 * 3600),
            request_timeout: Duration::from_secs(30),
            metrics_enabled: true,
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let mut config = Self::new(jwt_secret)?;

        config.http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        config.free_tool_limit = std::env::var("FREE_TOOL_LIMIT")
            .unwrap_or_else(|_| DEFAULT_FREE_LIMIT.to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("FREE_TOOL_LIMIT"))?;

        // Token lifetime (default 24 hours)
        let token_ttl_hours: u64 = std::env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("TOKEN_TTL_HOURS"))?;
        config.token_ttl = Duration::from_secs(token_ttl_hours * 3600);

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;
        config.request_timeout = Duration::from_secs(request_timeout_secs);

        config.metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(config)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
