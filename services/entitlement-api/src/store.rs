//! Account storage
//!
//! The store is the single serialization point for authenticated usage:
//! [`AccountStore::try_consume`] checks and increments under one lock per
//! account, so two tabs racing for the last use cannot both win.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use toolgate_types::{AccountId, EntitlementDecision, Plan, ToolName};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// No account with this ID
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Stored account with its usage counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: String,
    pub plan: Plan,
    /// Tool uses consumed so far (never moves for pro accounts)
    pub used: u32,
    pub created_at: DateTime<Utc>,
    pub upgraded_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    /// New free account with an empty counter
    pub fn new(id: AccountId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            plan: Plan::Free,
            used: 0,
            created_at: Utc::now(),
            upgraded_at: None,
        }
    }

    /// Decision for this account under `free_limit`
    pub fn decision(&self, free_limit: u32) -> EntitlementDecision {
        EntitlementDecision::for_plan(self.plan, self.used, free_limit)
    }
}

/// One accepted tool use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub account: AccountId,
    pub tool: ToolName,
    pub plan: Plan,
    pub at: DateTime<Utc>,
}

/// Outcome of a check-and-increment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The use was counted (or not metered, for pro)
    Recorded(AccountRecord),
    /// The counter was already at the limit; nothing changed
    LimitReached(AccountRecord),
}

/// Account store trait
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by ID
    async fn find(&self, id: &AccountId) -> StoreResult<Option<AccountRecord>>;

    /// Fetch an account, provisioning a free one on first sight.
    /// The stored email follows the latest token.
    async fn get_or_create(&self, id: &AccountId, email: &str) -> StoreResult<AccountRecord>;

    /// Atomically count one use unless the free limit is already reached
    async fn try_consume(&self, id: &AccountId, free_limit: u32) -> StoreResult<ConsumeOutcome>;

    /// Change an account's plan, returning the previous plan
    async fn set_plan(&self, id: &AccountId, plan: Plan) -> StoreResult<(Plan, AccountRecord)>;

    /// Append to the usage history. Stores may bound the history per
    /// account, dropping the oldest events first.
    async fn append_event(&self, event: UsageEvent) -> StoreResult<()>;

    /// Retained usage history of an account, oldest first
    async fn events_for(&self, id: &AccountId) -> StoreResult<Vec<UsageEvent>>;
}

/// Usage events kept per account by [`InMemoryAccountStore`]
pub const DEFAULT_EVENT_CAPACITY: usize = 1_000;

/// In-memory account store.
///
/// Counters are authoritative for the life of the process. The usage
/// history is a bounded per-account ring; pro accounts are never limited,
/// so an unbounded log would grow without end.
#[derive(Debug, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<DashMap<AccountId, AccountRecord>>,
    events: Arc<DashMap<AccountId, VecDeque<UsageEvent>>>,
    event_capacity: usize,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `capacity` usage events per account
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            accounts: Arc::new(DashMap::new()),
            events: Arc::new(DashMap::new()),
            event_capacity: capacity.max(1),
        }
    }

    /// Insert an account directly
    pub fn insert(&self, record: AccountRecord) {
        self.accounts.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find(&self, id: &AccountId) -> StoreResult<Option<AccountRecord>> {
        Ok(self.accounts.get(id).map(|r| r.value().clone()))
    }

    async fn get_or_create(&self, id: &AccountId, email: &str) -> StoreResult<AccountRecord> {
        let mut entry = self.accounts.entry(id.clone()).or_insert_with(|| {
            tracing::info!(account = %id, "provisioning free account");
            AccountRecord::new(id.clone(), email)
        });
        if entry.email != email {
            entry.email = email.to_string();
        }
        Ok(entry.value().clone())
    }

    async fn try_consume(&self, id: &AccountId, free_limit: u32) -> StoreResult<ConsumeOutcome> {
        let mut record = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;

        match record.plan {
            Plan::Pro => Ok(ConsumeOutcome::Recorded(record.clone())),
            Plan::Free if record.used >= free_limit => {
                Ok(ConsumeOutcome::LimitReached(record.clone()))
            }
            Plan::Free => {
                record.used += 1;
                Ok(ConsumeOutcome::Recorded(record.clone()))
            }
        }
    }

    async fn set_plan(&self, id: &AccountId, plan: Plan) -> StoreResult<(Plan, AccountRecord)> {
        let mut record = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;

        let previous = std::mem::replace(&mut record.plan, plan);
        if plan == Plan::Pro && previous != Plan::Pro {
            record.upgraded_at = Some(Utc::now());
        }
        Ok((previous, record.clone()))
    }

    async fn append_event(&self, event: UsageEvent) -> StoreResult<()> {
        let mut log = self.events.entry(event.account.clone()).or_default();
        if log.len() >= self.event_capacity {
            log.pop_front();
        }
        log.push_back(event);
        Ok(())
    }

    async fn events_for(&self, id: &AccountId) -> StoreResult<Vec<UsageEvent>> {
        Ok(self
            .events
            .get(id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default())
    }
}
