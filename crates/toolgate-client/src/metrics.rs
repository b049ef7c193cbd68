//! Client metrics for observability.
//!
//! # Metrics
//!
//! - `toolgate_client_requests_total` - Counter of requests by endpoint and status
//! - `toolgate_client_request_duration_seconds` - Histogram of request latencies
//! - `toolgate_client_retries_total` - Counter of access check retries
//! - `toolgate_client_decisions_total` - Counter of decisions by visitor class and outcome
//! - `toolgate_client_errors_total` - Counter of gate errors by kind
//! - `toolgate_client_cache_hits` - Counter of pro plan cache short-circuits
//!
//! Metrics are recorded whenever a `metrics` recorder is installed; the crate
//! installs none itself.

use std::time::Instant;

use metrics::{counter, histogram};

use crate::error::ErrorKind;

/// Metric name for total requests.
pub const REQUESTS_TOTAL: &str = "toolgate_client_requests_total";

/// Metric name for request duration histogram.
pub const REQUEST_DURATION_SECONDS: &str = "toolgate_client_request_duration_seconds";

/// Metric name for retry counter.
pub const RETRIES_TOTAL: &str = "toolgate_client_retries_total";

/// Metric name for decisions.
pub const DECISIONS_TOTAL: &str = "toolgate_client_decisions_total";

/// Metric name for gate errors.
pub const ERRORS_TOTAL: &str = "toolgate_client_errors_total";

/// Metric name for plan cache hits.
pub const CACHE_HITS: &str = "toolgate_client_cache_hits";

/// Server endpoints for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ToolAccess,
    ToolUsage,
    UserProfile,
    UpgradePlan,
}

impl Endpoint {
    /// Get the endpoint name as a string for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolAccess => "tool_access",
            Self::ToolUsage => "tool_usage",
            Self::UserProfile => "user_profile",
            Self::UpgradePlan => "upgrade_plan",
        }
    }
}

/// Request status for metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Timeout,
    Cancelled,
}

impl Status {
    /// Get the status as a string for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Record a request completion.
pub fn record_request(endpoint: Endpoint, status: Status, duration_seconds: f64) {
    counter!(
        REQUESTS_TOTAL,
        "endpoint" => endpoint.as_str(),
        "status" => status.as_str()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "endpoint" => endpoint.as_str()
    )
    .record(duration_seconds);
}

/// Record a retry attempt (1-indexed).
pub fn record_retry(attempt: u32) {
    counter!(RETRIES_TOTAL, "attempt" => attempt.to_string()).increment(1);
}

/// Record a decision handed to the UI.
pub fn record_decision(visitor: &'static str, allowed: bool) {
    counter!(
        DECISIONS_TOTAL,
        "visitor" => visitor,
        "allowed" => if allowed { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a gate error.
pub fn record_error(kind: ErrorKind) {
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record a pro plan cache short-circuit.
pub fn record_cache_hit(operation: &'static str) {
    counter!(CACHE_HITS, "operation" => operation).increment(1);
}

/// Timer guard for automatically recording request duration.
///
/// Records the request as cancelled if dropped without an explicit outcome,
/// which is what happens when a view is torn down mid-request.
#[must_use]
pub struct RequestTimer {
    endpoint: Endpoint,
    start: Instant,
    recorded: bool,
}

impl RequestTimer {
    /// Start a new request timer.
    pub fn start(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Record the outcome and return the duration.
    pub fn finish(mut self, status: Status) -> std::time::Duration {
        let duration = self.start.elapsed();
        record_request(self.endpoint, status, duration.as_secs_f64());
        self.recorded = true;
        duration
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.recorded {
            let duration = self.start.elapsed();
            record_request(self.endpoint, Status::Cancelled, duration.as_secs_f64());
        }
    }
}

/// Describe all metrics for registration with a recorder.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram, Unit};

    describe_counter!(
        REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests made to the entitlement server"
    );
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of entitlement server requests in seconds"
    );
    describe_counter!(RETRIES_TOTAL, Unit::Count, "Total number of access check retries");
    describe_counter!(
        DECISIONS_TOTAL,
        Unit::Count,
        "Entitlement decisions by visitor class and outcome"
    );
    describe_counter!(ERRORS_TOTAL, Unit::Count, "Gate errors by category");
    describe_counter!(
        CACHE_HITS,
        Unit::Count,
        "Access checks answered from the pro plan cache"
    );
}
