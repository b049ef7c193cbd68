//! Toolgate Types - Shared domain types
//!
//! This crate contains the types shared by the entitlement client and the
//! entitlement server:
//! - Account identity and plans
//! - Usage counters and entitlement decisions
//! - The tool catalogue
//! - HTTP request/response bodies for the entitlement contract

pub mod account;
pub mod api;
pub mod entitlement;
pub mod error;
pub mod plan;
pub mod tool;

pub use account::*;
pub use entitlement::*;
pub use error::*;
pub use plan::*;
pub use tool::*;
