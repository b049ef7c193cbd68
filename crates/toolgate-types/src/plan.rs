//! Account plan types

use serde::{Deserialize, Serialize};

/// Account plan.
///
/// Decoding is lenient: any value other than the literal `pro` is treated as
/// [`Plan::Free`], so unknown or legacy plan strings never unlock unlimited use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Plan {
    /// Metered plan with a fixed number of tool uses
    #[default]
    Free,
    /// Unlimited plan
    Pro,
}

impl Plan {
    /// Parse a plan string. Only the exact string `pro` yields [`Plan::Pro`].
    pub fn from_plan_str(s: &str) -> Self {
        if s == "pro" {
            Self::Pro
        } else {
            Self::Free
        }
    }

    /// Whether this plan has unlimited tool access
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Pro)
    }

    /// Get the plan name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}

impl From<String> for Plan {
    fn from(s: String) -> Self {
        Self::from_plan_str(&s)
    }
}

impl From<&str> for Plan {
    fn from(s: &str) -> Self {
        Self::from_plan_str(s)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
