//! Entitlement decision types

use serde::{Deserialize, Serialize};

use crate::Plan;

/// Default number of tool uses for anonymous visitors
pub const DEFAULT_ANONYMOUS_LIMIT: u32 = 3;

/// Default number of tool uses for free accounts
pub const DEFAULT_FREE_LIMIT: u32 = 30;

/// Usage limits per visitor class.
///
/// The two limits are independent; neither is derived from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Uses granted to anonymous visitors
    pub anonymous: u32,
    /// Uses granted to free accounts
    pub free: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            anonymous: DEFAULT_ANONYMOUS_LIMIT,
            free: DEFAULT_FREE_LIMIT,
        }
    }
}

impl Limits {
    /// Create limits with explicit values
    pub const fn new(anonymous: u32, free: u32) -> Self {
        Self { anonymous, free }
    }
}

/// Result of an access check.
///
/// `remaining` is `None` for unlimited access. It is never negative, and
/// `allowed` is always `remaining > 0` for metered decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    /// Whether a tool may be invoked now
    pub allowed: bool,
    /// Remaining uses, `None` when unlimited
    pub remaining: Option<u32>,
}

impl EntitlementDecision {
    /// Unlimited access
    pub const fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: None,
        }
    }

    /// Metered access with a known number of remaining uses
    pub const fn metered(remaining: u32) -> Self {
        Self {
            allowed: remaining > 0,
            remaining: Some(remaining),
        }
    }

    /// Metered access with no uses left
    pub const fn exhausted() -> Self {
        Self::metered(0)
    }

    /// Metered access computed from a consumed count and a limit
    pub const fn from_count(count: u32, limit: u32) -> Self {
        Self::metered(limit.saturating_sub(count))
    }

    /// Decision for an account on `plan` that has consumed `count` of `free_limit`
    pub const fn for_plan(plan: Plan, count: u32, free_limit: u32) -> Self {
        match plan {
            Plan::Pro => Self::unlimited(),
            Plan::Free => Self::from_count(count, free_limit),
        }
    }

    /// Whether this decision grants unlimited use
    pub const fn is_unlimited(&self) -> bool {
        self.remaining.is_none()
    }
}
