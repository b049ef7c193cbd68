//! HTTP contract between the entitlement client and the entitlement server
//!
//! All endpoints require `Authorization: Bearer <token>`. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::{Account, AccountId, EntitlementDecision, Plan, ToolName};

/// `GET` - current access decision for the caller
pub const TOOL_ACCESS_PATH: &str = "/api/tool-access";
/// `POST` - record one tool use for the caller
pub const TOOL_USAGE_PATH: &str = "/api/tool-usage";
/// `GET` - caller profile
pub const USER_PROFILE_PATH: &str = "/api/user-profile";
/// `POST` - move the caller to the pro plan
pub const UPGRADE_PLAN_PATH: &str = "/api/upgrade-plan";

/// Error code: no credential supplied
pub const CODE_MISSING_TOKEN: &str = "MISSING_TOKEN";
/// Error code: credential invalid or expired
pub const CODE_INVALID_TOKEN: &str = "INVALID_TOKEN";
/// Error code: usage limit already reached, increment rejected
pub const CODE_LIMIT_REACHED: &str = "LIMIT_REACHED";
/// Error code: malformed request
pub const CODE_BAD_REQUEST: &str = "BAD_REQUEST";
/// Error code: server-side failure
pub const CODE_INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Response to `GET /api/tool-access`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAccessResponse {
    /// Whether the caller may use a tool now
    pub allowed: bool,
    /// Remaining uses, `null` for unlimited
    pub remaining_uses: Option<u32>,
    /// Caller's plan
    #[serde(default)]
    pub plan: Plan,
}

impl ToolAccessResponse {
    /// Build the response for a decision
    pub fn new(decision: EntitlementDecision, plan: Plan) -> Self {
        Self {
            allowed: decision.allowed,
            remaining_uses: decision.remaining,
            plan,
        }
    }

    /// Recompute the decision from the reported plan and remaining uses.
    ///
    /// A free response without a count, or one that denies access while
    /// reporting uses left, is treated as exhausted.
    pub fn decision(&self) -> EntitlementDecision {
        match (self.plan, self.remaining_uses) {
            (Plan::Pro, _) => EntitlementDecision::unlimited(),
            (Plan::Free, Some(remaining)) if self.allowed => EntitlementDecision::metered(remaining),
            (Plan::Free, _) => EntitlementDecision::exhausted(),
        }
    }
}

/// Body of `POST /api/tool-usage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageRequest {
    /// Tool being invoked
    pub tool_name: ToolName,
}

/// Response to `POST /api/tool-usage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageResponse {
    /// Remaining uses after this one, `null` for unlimited
    pub remaining_uses: Option<u32>,
    /// Caller's plan
    #[serde(default)]
    pub plan: Plan,
}

impl ToolUsageResponse {
    /// Decision after the recorded use
    pub fn decision(&self) -> EntitlementDecision {
        match self.plan {
            Plan::Pro => EntitlementDecision::unlimited(),
            Plan::Free => EntitlementDecision::metered(self.remaining_uses.unwrap_or(0)),
        }
    }
}

/// Response to `GET /api/user-profile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// Account ID
    pub id: AccountId,
    /// Email address
    pub email: String,
    /// Current plan
    #[serde(default)]
    pub plan: Plan,
    /// Remaining uses, `null` for unlimited
    pub remaining_uses: Option<u32>,
}

impl ProfileResponse {
    /// The account described by this profile
    pub fn account(&self) -> Account {
        Account {
            id: self.id.clone(),
            email: self.email.clone(),
            plan: self.plan,
        }
    }

    /// Decision implied by the profile's plan and remaining uses
    pub fn decision(&self) -> EntitlementDecision {
        match self.plan {
            Plan::Pro => EntitlementDecision::unlimited(),
            Plan::Free => EntitlementDecision::metered(self.remaining_uses.unwrap_or(0)),
        }
    }
}

/// Response to `POST /api/upgrade-plan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResponse {
    /// Plan after the upgrade
    pub plan: Plan,
    /// Plan before the upgrade
    pub previous_plan: Plan,
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code (e.g. `LIMIT_REACHED`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorResponse {
    /// Create an error body
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
