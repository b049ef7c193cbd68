//! HTTP handlers

mod access;
mod health;
mod profile;
mod usage;

pub use access::tool_access;
pub use health::health;
pub use profile::{upgrade_plan, user_profile};
pub use usage::record_tool_usage;
