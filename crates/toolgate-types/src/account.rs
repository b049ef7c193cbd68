//! Account types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Plan;

/// Unique account identifier.
///
/// Identifiers are issued by the identity provider and are opaque strings;
/// locally minted IDs are UUIDv4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new random account ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Account as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub id: AccountId,
    /// Email address
    pub email: String,
    /// Current plan
    pub plan: Plan,
}

/// Who a usage counter belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterOwner {
    /// Authenticated account (counter lives server-side)
    Account(AccountId),
    /// Anonymous visitor (counter lives in local storage)
    Anonymous,
}

/// Number of tool uses consumed by one owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCounter {
    /// Counter owner
    pub owner: CounterOwner,
    /// Uses consumed so far
    pub count: u32,
}

impl UsageCounter {
    /// Create a counter starting at zero
    pub fn new(owner: CounterOwner) -> Self {
        Self { owner, count: 0 }
    }

    /// Create a counter for an anonymous visitor with a known count
    pub fn anonymous(count: u32) -> Self {
        Self {
            owner: CounterOwner::Anonymous,
            count,
        }
    }

    /// Whether this counter belongs to an anonymous visitor
    pub fn is_anonymous(&self) -> bool {
        self.owner == CounterOwner::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_transparent_serde() {
        let id = AccountId::from("user_2abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user_2abc\"");
    }

    #[test]
    fn test_new_account_ids_are_unique() {
        assert_ne!(AccountId::new(), AccountId::new());
    }

    #[test]
    fn test_usage_counter_owner() {
        assert!(UsageCounter::anonymous(2).is_anonymous());
        let counter = UsageCounter::new(CounterOwner::Account(AccountId::from("a")));
        assert!(!counter.is_anonymous());
        assert_eq!(counter.count, 0);
    }
}
