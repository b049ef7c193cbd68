//! Plan flag cache
//!
//! Remembers the last plan the server reported for a credential so that pro
//! accounts skip the usage read entirely. Entries expire after a short TTL so
//! a downgrade is picked up on a later check.
//!
//! Keys are a hash of the credential, never the raw token.

use std::time::Duration;

use moka::future::Cache;
use toolgate_types::Plan;

use crate::config::Credential;

/// Maximum number of cached credentials (one per signed-in tab in practice).
const MAX_ENTRIES: u64 = 64;

/// Cached plan per credential.
#[derive(Clone)]
pub struct PlanCache {
    plans: Cache<String, Plan>,
    ttl: Duration,
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.plans.entry_count())
            .finish()
    }
}

impl PlanCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            plans: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    /// Cached plan for a credential.
    pub async fn get(&self, credential: &Credential) -> Option<Plan> {
        self.plans.get(&hash_token(credential.expose())).await
    }

    /// Whether the credential is known to be on the pro plan.
    pub async fn is_pro(&self, credential: &Credential) -> bool {
        matches!(self.get(credential).await, Some(Plan::Pro))
    }

    /// Remember the plan reported for a credential.
    pub async fn insert(&self, credential: &Credential, plan: Plan) {
        self.plans.insert(hash_token(credential.expose()), plan).await;
    }

    /// Forget the plan for a credential.
    pub async fn invalidate(&self, credential: &Credential) {
        self.plans.invalidate(&hash_token(credential.expose())).await;
    }
}

/// Hash a token for cache key.
///
/// A fast non-cryptographic hash; it only keeps raw tokens out of memory dumps
/// of the cache.
fn hash_token(token: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
