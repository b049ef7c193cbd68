//! Client errors
//!
//! Every error maps to exactly one of three categories the UI gate acts on:
//! authentication (send to sign-in), quota exceeded (offer the upgrade), and
//! transport (fail closed, offer a retry).

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use toolgate_types::EntitlementDecision;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors returned by the entitlement client.
#[derive(Error, Debug)]
pub enum GateError {
    /// Credential missing, invalid or expired.
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// No tool uses left on the current plan.
    #[error("usage limit reached: {0}")]
    QuotaExceeded(String),

    /// Request did not complete before its deadline.
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// Failed to reach the entitlement server.
    #[error("connection error: {message}")]
    Connection {
        /// Error message
        message: String,
        /// Whether the error is retryable
        retryable: bool,
    },

    /// Server answered with an unexpected status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message from the body, if any
        message: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Local storage failure.
    #[error("local storage error: {0}")]
    Store(#[from] StoreError),

    /// Operation abandoned because the owning view was torn down.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Category of a [`GateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Redirect to sign-in; does not count against quota.
    Authentication,
    /// User-visible limit error with an upgrade path.
    QuotaExceeded,
    /// Network or server failure; access is not granted.
    Transport,
}

impl ErrorKind {
    /// Get the kind as a string for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Transport => "transport",
        }
    }
}

impl GateError {
    /// Category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Authentication,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::Timeout(_)
            | Self::Connection { .. }
            | Self::Server { .. }
            | Self::Decode(_)
            | Self::Store(_)
            | Self::Cancelled
            | Self::Config(_) => ErrorKind::Transport,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { retryable, .. } => *retryable,
            Self::Timeout(_) => true,
            Self::Server { status, .. } => matches!(status, 502..=504),
            Self::Unauthenticated(_) => false, // Need new credentials
            Self::QuotaExceeded(_) => false,   // Retrying cannot create quota
            Self::Decode(_) | Self::Store(_) | Self::Cancelled | Self::Config(_) => false,
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>, retryable: bool) -> Self {
        Self::Connection {
            message: message.into(),
            retryable,
        }
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::connection(err.to_string(), false)
        } else {
            Self::connection(err.to_string(), true)
        }
    }
}

/// Terminal outcome handed to a UI gate.
///
/// Serializes as `{"status": "ok", "decision": {...}}` or
/// `{"status": "error", "kind": "...", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GateReport {
    /// A decision was reached.
    Ok {
        /// The decision
        decision: EntitlementDecision,
    },
    /// The operation failed; access is not granted.
    Error {
        /// Error category
        kind: ErrorKind,
        /// Human-readable message
        message: String,
    },
}

impl GateReport {
    /// Whether a tool may be used according to this report.
    #[must_use]
    pub fn allowed(&self) -> bool {
        matches!(self, Self::Ok { decision } if decision.allowed)
    }
}

impl From<Result<EntitlementDecision>> for GateReport {
    fn from(result: Result<EntitlementDecision>) -> Self {
        match result {
            Ok(decision) => Self::Ok { decision },
            Err(err) => Self::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GateError::Unauthenticated("expired".to_string()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            GateError::QuotaExceeded("0 left".to_string()).kind(),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(GateError::Timeout(Duration::from_secs(3)).kind(), ErrorKind::Transport);
        assert_eq!(GateError::Cancelled.kind(), ErrorKind::Transport);
        assert_eq!(
            GateError::Server {
                status: 500,
                message: "boom".to_string()
            }
            .kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GateError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(GateError::connection("reset", true).is_retryable());
        assert!(GateError::Server {
            status: 503,
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!GateError::Unauthenticated("no token".to_string()).is_retryable());
        assert!(!GateError::QuotaExceeded("limit".to_string()).is_retryable());
        assert!(!GateError::Server {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(!GateError::connection("bad url", false).is_retryable());
    }

    #[test]
    fn test_report_serialization() {
        let ok = GateReport::from(Ok(EntitlementDecision::metered(2)));
        assert!(ok.allowed());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"status": "ok", "decision": {"allowed": true, "remaining": 2}})
        );

        let err = GateReport::from(Err(GateError::QuotaExceeded("none left".to_string())));
        assert!(!err.allowed());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "quota_exceeded");
    }

    #[test]
    fn test_denied_decision_report_not_allowed() {
        let report = GateReport::from(Ok(EntitlementDecision::exhausted()));
        assert!(!report.allowed());
    }
}
