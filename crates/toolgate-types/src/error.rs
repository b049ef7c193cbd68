//! Common error types

use thiserror::Error;

/// Errors produced when validating a tool name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolNameError {
    /// Tool name is empty
    #[error("tool name cannot be empty")]
    Empty,

    /// Tool name exceeds the maximum length
    #[error("tool name too long: {len} > {max}")]
    TooLong {
        /// Actual length
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Tool name does not start with a letter
    #[error("tool name must start with a letter: {0}")]
    InvalidStart(String),

    /// Tool name contains characters outside `[A-Za-z0-9_-]`
    #[error("invalid characters in tool name: {0}")]
    InvalidCharacters(String),
}
