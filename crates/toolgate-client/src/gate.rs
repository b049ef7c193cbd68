//! The entitlement gate
//!
//! [`EntitlementClient`] answers "may the current visitor use a tool right
//! now?" and records consumption. Anonymous visitors are metered against the
//! local [`Store`]; signed-in visitors against the entitlement server, which
//! is the only serialization point for their counter.
//!
//! Gate state sits behind a mutex that is never held across a network await,
//! so checks and recordings from several tasks may interleave freely.

use std::sync::Arc;

use tokio::sync::Mutex;
use toolgate_types::{Account, EntitlementDecision, Plan, ToolName};
use tracing::{debug, info, instrument, warn};

use crate::cache::PlanCache;
use crate::config::{Credential, GateConfig};
use crate::error::{ErrorKind, GateError, Result};
use crate::lifecycle::Lifecycle;
use crate::metrics;
use crate::navigator::{Navigator, NoopNavigator};
use crate::retry::retry_access;
use crate::store::{read_count, write_count, Store};
use crate::transport::{EntitlementApi, HttpEntitlementApi};

/// Who is using the tools.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visitor {
    /// Not signed in; metered locally.
    #[default]
    Anonymous,
    /// Signed in; metered by the entitlement server.
    Authenticated(Credential),
}

impl Visitor {
    /// Credential of a signed-in visitor.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(credential) => Some(credential),
        }
    }

    /// Whether the visitor is signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// Account details with the decision they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// The signed-in account
    pub account: Account,
    /// Current decision for the account
    pub decision: EntitlementDecision,
}

#[derive(Debug, Default)]
struct GateState {
    visitor: Visitor,
    decision: Option<EntitlementDecision>,
    /// Bumped on every visitor switch; results computed for an older
    /// generation are returned to their caller but never stored.
    generation: u64,
}

/// Usage entitlement gate for one view.
pub struct EntitlementClient<S> {
    config: GateConfig,
    api: Arc<dyn EntitlementApi>,
    store: S,
    navigator: Arc<dyn Navigator>,
    plan_cache: PlanCache,
    lifecycle: Lifecycle,
    state: Mutex<GateState>,
}

impl<S> std::fmt::Debug for EntitlementClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementClient")
            .field("endpoint", &self.config.endpoint())
            .field("plan_cache", &self.plan_cache)
            .field("active", &self.lifecycle.is_active())
            .finish_non_exhaustive()
    }
}

impl<S: Store> EntitlementClient<S> {
    /// Create a gate talking HTTP to the configured endpoint.
    pub fn connect(config: GateConfig, store: S) -> Result<Self> {
        let api = HttpEntitlementApi::new(&config)?;
        Ok(Self::new(config, Arc::new(api), store))
    }

    /// Create a gate over any [`EntitlementApi`].
    pub fn new(config: GateConfig, api: Arc<dyn EntitlementApi>, store: S) -> Self {
        let plan_cache = PlanCache::new(config.plan_cache_ttl());
        Self {
            config,
            api,
            store,
            navigator: Arc::new(NoopNavigator),
            plan_cache,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(GateState::default()),
        }
    }

    /// Use `navigator` for [`redirect_to_upgrade`](Self::redirect_to_upgrade).
    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Start out signed in with `credential`.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.state.get_mut().visitor = Visitor::Authenticated(credential);
        self
    }

    /// Share a plan cache with other gates (e.g. several views of one app).
    #[must_use]
    pub fn with_plan_cache(mut self, plan_cache: PlanCache) -> Self {
        self.plan_cache = plan_cache;
        self
    }

    /// Client configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Teardown handle of the owning view.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Abandon in-flight calls; nothing is written to gate state afterwards.
    pub fn teardown(&self) {
        debug!("gate torn down");
        self.lifecycle.teardown();
    }

    /// Current visitor.
    pub async fn visitor(&self) -> Visitor {
        self.state.lock().await.visitor.clone()
    }

    /// Decision currently on display, if any.
    pub async fn last_decision(&self) -> Option<EntitlementDecision> {
        self.state.lock().await.decision
    }

    /// Switch to a signed-in visitor.
    ///
    /// The anonymous counter is not merged into the account; it stays in the
    /// store and resumes after [`sign_out`](Self::sign_out).
    pub async fn sign_in(&self, credential: Credential) {
        let mut state = self.state.lock().await;
        state.visitor = Visitor::Authenticated(credential);
        state.decision = None;
        state.generation += 1;
        info!("visitor signed in");
    }

    /// Switch back to an anonymous visitor.
    pub async fn sign_out(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            state.decision = None;
            state.generation += 1;
            std::mem::take(&mut state.visitor)
        };
        if let Some(credential) = previous.credential() {
            self.plan_cache.invalidate(credential).await;
        }
        info!("visitor signed out");
    }

    /// Decide whether the current visitor may use a tool now.
    ///
    /// Fails closed: a transport failure never grants access and leaves the
    /// previously displayed decision in place. An authentication failure
    /// drops it.
    #[instrument(skip(self), level = "debug")]
    pub async fn check_access(&self) -> Result<EntitlementDecision> {
        let (visitor, generation, _) = self.snapshot().await;

        let result = match &visitor {
            Visitor::Anonymous => self.anonymous_decision(),
            Visitor::Authenticated(credential) => self.remote_decision(credential).await,
        };

        self.settle(generation, &visitor, result).await
    }

    /// Record one use of `tool` and return the decision after it.
    ///
    /// A cached denial is rejected here without touching the server. Pro
    /// accounts are not metered. Recording for a signed-in free account is
    /// never retried.
    pub async fn record_usage(&self, tool: impl Into<ToolName>) -> Result<EntitlementDecision> {
        self.record(tool.into()).await
    }

    #[instrument(skip_all, fields(tool = %tool), level = "debug")]
    async fn record(&self, tool: ToolName) -> Result<EntitlementDecision> {
        if !self.lifecycle.is_active() {
            return Err(GateError::Cancelled);
        }

        let (visitor, generation, cached) = self.snapshot().await;
        let cached = match cached {
            Some(decision) => decision,
            None => self.check_access().await?,
        };

        let credential = match &visitor {
            Visitor::Anonymous => {
                let result = self.record_anonymous();
                return self.settle(generation, &visitor, result).await;
            }
            Visitor::Authenticated(credential) => credential,
        };

        if cached.is_unlimited() {
            debug!("pro plan, usage not metered");
            return Ok(cached);
        }

        if !cached.allowed {
            let err = GateError::QuotaExceeded("no tool uses remaining".to_string());
            metrics::record_error(err.kind());
            return Err(err);
        }

        let result = self.record_remote(credential, &tool).await;
        self.settle(generation, &visitor, result).await
    }

    /// Send the visitor to the pricing view.
    pub fn redirect_to_upgrade(&self) {
        let route = self.config.upgrade_route();
        debug!(route, "redirecting to upgrade");
        self.navigator.navigate(route);
    }

    /// Move the signed-in account to the pro plan.
    #[instrument(skip(self), level = "debug")]
    pub async fn upgrade_plan(&self) -> Result<EntitlementDecision> {
        let (visitor, generation, _) = self.snapshot().await;
        let credential = signed_in(&visitor, "upgrading requires a signed-in account")?;

        let timeout = self.config.request_timeout();
        let result = self
            .lifecycle
            .guard(async {
                tokio::time::timeout(timeout, self.api.upgrade_plan(credential))
                    .await
                    .map_err(|_| GateError::Timeout(timeout))?
            })
            .await;

        let result = match result {
            Ok(response) if response.plan == Plan::Pro => {
                info!(previous = %response.previous_plan, "plan upgraded");
                self.plan_cache.insert(credential, Plan::Pro).await;
                Ok(EntitlementDecision::unlimited())
            }
            Ok(_) => self.remote_decision(credential).await,
            Err(err) => Err(err),
        };

        self.settle(generation, &visitor, result).await
    }

    /// Fetch the signed-in account and refresh the displayed decision.
    #[instrument(skip(self), level = "debug")]
    pub async fn profile(&self) -> Result<Profile> {
        let (visitor, generation, _) = self.snapshot().await;
        let credential = signed_in(&visitor, "profile requires a signed-in account")?;

        let timeout = self.config.request_timeout();
        let result = self
            .lifecycle
            .guard(async {
                tokio::time::timeout(timeout, self.api.user_profile(credential))
                    .await
                    .map_err(|_| GateError::Timeout(timeout))?
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.reject(generation, &visitor, err).await),
        };

        self.plan_cache.insert(credential, response.plan).await;
        let decision = self.settle(generation, &visitor, Ok(response.decision())).await?;

        Ok(Profile {
            account: response.account(),
            decision,
        })
    }

    async fn snapshot(&self) -> (Visitor, u64, Option<EntitlementDecision>) {
        let state = self.state.lock().await;
        (state.visitor.clone(), state.generation, state.decision)
    }

    fn anonymous_decision(&self) -> Result<EntitlementDecision> {
        let count = read_count(&self.store, self.config.storage_key())?;
        Ok(EntitlementDecision::from_count(
            count,
            self.config.anonymous_limit(),
        ))
    }

    fn record_anonymous(&self) -> Result<EntitlementDecision> {
        let key = self.config.storage_key();
        let limit = self.config.anonymous_limit();

        let count = read_count(&self.store, key)?;
        if count >= limit {
            return Err(GateError::QuotaExceeded(format!(
                "anonymous limit of {limit} uses reached"
            )));
        }

        let count = count + 1;
        write_count(&self.store, key, count)?;
        Ok(EntitlementDecision::from_count(count, limit))
    }

    async fn remote_decision(&self, credential: &Credential) -> Result<EntitlementDecision> {
        if self.plan_cache.is_pro(credential).await {
            metrics::record_cache_hit("check_access");
            return Ok(EntitlementDecision::unlimited());
        }

        let timeout = self.config.check_timeout();
        let api = &self.api;
        let response = self
            .lifecycle
            .guard(async {
                let check = retry_access(self.config.retry(), timeout, || {
                    api.tool_access(credential)
                });
                tokio::time::timeout(timeout, check)
                    .await
                    .map_err(|_| GateError::Timeout(timeout))?
            })
            .await?;

        self.plan_cache.insert(credential, response.plan).await;
        Ok(response.decision())
    }

    async fn record_remote(
        &self,
        credential: &Credential,
        tool: &ToolName,
    ) -> Result<EntitlementDecision> {
        let timeout = self.config.request_timeout();
        let response = self
            .lifecycle
            .guard(async {
                tokio::time::timeout(timeout, self.api.record_tool_usage(credential, tool))
                    .await
                    .map_err(|_| GateError::Timeout(timeout))?
            })
            .await?;

        if response.plan == Plan::Pro {
            self.plan_cache.insert(credential, Plan::Pro).await;
        }
        Ok(response.decision())
    }

    async fn settle(
        &self,
        generation: u64,
        visitor: &Visitor,
        result: Result<EntitlementDecision>,
    ) -> Result<EntitlementDecision> {
        match result {
            Ok(decision) => self.adopt(generation, visitor, decision).await,
            Err(err) => Err(self.reject(generation, visitor, err).await),
        }
    }

    async fn adopt(
        &self,
        generation: u64,
        visitor: &Visitor,
        decision: EntitlementDecision,
    ) -> Result<EntitlementDecision> {
        if !self.lifecycle.is_active() {
            return Err(GateError::Cancelled);
        }

        {
            let mut state = self.state.lock().await;
            if state.generation == generation {
                state.decision = Some(decision);
            }
        }

        metrics::record_decision(visitor.label(), decision.allowed);
        debug!(
            visitor = visitor.label(),
            allowed = decision.allowed,
            remaining = ?decision.remaining,
            "decision"
        );
        Ok(decision)
    }

    async fn reject(&self, generation: u64, visitor: &Visitor, err: GateError) -> GateError {
        metrics::record_error(err.kind());

        if matches!(err, GateError::Cancelled) || !self.lifecycle.is_active() {
            debug!("gate torn down, result discarded");
            return GateError::Cancelled;
        }

        match err.kind() {
            ErrorKind::Authentication => {
                warn!(visitor = visitor.label(), error = %err, "credential rejected");
                if let Some(credential) = visitor.credential() {
                    self.plan_cache.invalidate(credential).await;
                }
                let mut state = self.state.lock().await;
                if state.generation == generation {
                    state.decision = None;
                }
            }
            ErrorKind::QuotaExceeded => {
                info!(visitor = visitor.label(), "usage limit reached");
                let mut state = self.state.lock().await;
                if state.generation == generation {
                    state.decision = Some(EntitlementDecision::exhausted());
                }
            }
            ErrorKind::Transport => {
                warn!(visitor = visitor.label(), error = %err, "failing closed");
            }
        }

        err
    }
}

fn signed_in<'a>(visitor: &'a Visitor, message: &str) -> Result<&'a Credential> {
    visitor
        .credential()
        .ok_or_else(|| GateError::Unauthenticated(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use toolgate_types::api::{
        ProfileResponse, ToolAccessResponse, ToolUsageResponse, UpgradeResponse,
    };
    use toolgate_types::{AccountId, Tool};

    use crate::retry::RetryConfig;
    use crate::store::MemoryStore;

    /// In-process server double: a free/pro account with a counter.
    struct FakeApi {
        plan: StdMutex<Plan>,
        remaining: StdMutex<u32>,
        reject_auth: bool,
        access_calls: AtomicUsize,
        usage_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new(plan: Plan, remaining: u32) -> Self {
            Self {
                plan: StdMutex::new(plan),
                remaining: StdMutex::new(remaining),
                reject_auth: false,
                access_calls: AtomicUsize::new(0),
                usage_calls: AtomicUsize::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject_auth: true,
                ..Self::new(Plan::Free, 10)
            }
        }

        fn plan(&self) -> Plan {
            *self.plan.lock().unwrap()
        }
    }

    #[async_trait]
    impl EntitlementApi for FakeApi {
        async fn tool_access(&self, _: &Credential) -> Result<ToolAccessResponse> {
            self.access_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_auth {
                return Err(GateError::Unauthenticated("token expired".to_string()));
            }
            let remaining = *self.remaining.lock().unwrap();
            let decision = EntitlementDecision::for_plan(self.plan(), 0, remaining);
            Ok(ToolAccessResponse::new(decision, self.plan()))
        }

        async fn record_tool_usage(
            &self,
            _: &Credential,
            _: &ToolName,
        ) -> Result<ToolUsageResponse> {
            self.usage_calls.fetch_add(1, Ordering::SeqCst);
            if self.plan() == Plan::Pro {
                return Ok(ToolUsageResponse {
                    remaining_uses: None,
                    plan: Plan::Pro,
                });
            }
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return Err(GateError::QuotaExceeded("No uses remaining".to_string()));
            }
            *remaining -= 1;
            Ok(ToolUsageResponse {
                remaining_uses: Some(*remaining),
                plan: Plan::Free,
            })
        }

        async fn user_profile(&self, _: &Credential) -> Result<ProfileResponse> {
            Ok(ProfileResponse {
                id: AccountId::from("acct-1"),
                email: "dev@example.com".to_string(),
                plan: self.plan(),
                remaining_uses: match self.plan() {
                    Plan::Pro => None,
                    Plan::Free => Some(*self.remaining.lock().unwrap()),
                },
            })
        }

        async fn upgrade_plan(&self, _: &Credential) -> Result<UpgradeResponse> {
            let previous_plan = std::mem::replace(&mut *self.plan.lock().unwrap(), Plan::Pro);
            Ok(UpgradeResponse {
                plan: Plan::Pro,
                previous_plan,
            })
        }
    }

    #[derive(Default)]
    struct RecordingNavigator(StdMutex<Vec<String>>);

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_string());
        }
    }

    fn config() -> GateConfig {
        GateConfig::builder()
            .endpoint("http://localhost:8080")
            .retry(RetryConfig::disabled())
            .build()
            .unwrap()
    }

    fn gate(api: Arc<FakeApi>) -> EntitlementClient<MemoryStore> {
        EntitlementClient::new(config(), api, MemoryStore::new())
    }

    fn signed_in_gate(api: Arc<FakeApi>) -> EntitlementClient<MemoryStore> {
        gate(api).with_credential(Credential::bearer("token"))
    }

    #[tokio::test]
    async fn test_anonymous_never_calls_server() {
        let api = Arc::new(FakeApi::new(Plan::Free, 30));
        let gate = gate(api.clone());

        assert_eq!(gate.check_access().await.unwrap(), EntitlementDecision::metered(3));
        gate.record_usage(Tool::Ocr).await.unwrap();

        assert_eq!(api.access_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.usage_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_anonymous_exhaustion() {
        let gate = gate(Arc::new(FakeApi::new(Plan::Free, 30)));

        for expected in [2, 1, 0] {
            let decision = gate.record_usage(Tool::RegexBuilder).await.unwrap();
            assert_eq!(decision.remaining, Some(expected));
        }

        let err = gate.record_usage(Tool::RegexBuilder).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
        assert_eq!(gate.last_decision().await, Some(EntitlementDecision::exhausted()));
    }

    #[tokio::test]
    async fn test_free_record_adopts_server_count() {
        let api = Arc::new(FakeApi::new(Plan::Free, 2));
        let gate = signed_in_gate(api.clone());

        assert_eq!(gate.record_usage(Tool::SqlConverter).await.unwrap().remaining, Some(1));
        assert_eq!(gate.record_usage(Tool::SqlConverter).await.unwrap().remaining, Some(0));

        let err = gate.record_usage(Tool::SqlConverter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
        // The third attempt is refused from the cached denial.
        assert_eq!(api.usage_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pro_is_cached_and_unmetered() {
        let api = Arc::new(FakeApi::new(Plan::Pro, 0));
        let gate = signed_in_gate(api.clone());

        assert!(gate.check_access().await.unwrap().is_unlimited());
        assert!(gate.check_access().await.unwrap().is_unlimited());
        assert!(gate.record_usage(Tool::ImageTools).await.unwrap().is_unlimited());

        assert_eq!(api.access_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.usage_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_forgets_cached_pro_plan() {
        let api = Arc::new(FakeApi::new(Plan::Pro, 0));
        let gate = signed_in_gate(api.clone());

        assert!(gate.check_access().await.unwrap().is_unlimited());
        gate.sign_out().await;
        *api.plan.lock().unwrap() = Plan::Free;
        gate.sign_in(Credential::bearer("token")).await;

        // Downgraded while signed out: the server is asked again.
        assert_eq!(gate.check_access().await.unwrap(), EntitlementDecision::metered(0));
        assert_eq!(api.access_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_clears_decision() {
        let gate = signed_in_gate(Arc::new(FakeApi::rejecting()));

        let err = gate.check_access().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(gate.last_decision().await, None);
    }

    #[tokio::test]
    async fn test_sign_in_does_not_merge_anonymous_count() {
        let api = Arc::new(FakeApi::new(Plan::Free, 30));
        let store = MemoryStore::new();
        let gate = EntitlementClient::new(config(), api, store.clone());

        gate.record_usage(Tool::Ocr).await.unwrap();
        gate.sign_in(Credential::bearer("token")).await;
        assert_eq!(gate.last_decision().await, None);
        assert_eq!(gate.check_access().await.unwrap().remaining, Some(30));

        gate.sign_out().await;
        assert_eq!(gate.check_access().await.unwrap().remaining, Some(2));
        assert_eq!(
            store.get(crate::config::DEFAULT_STORAGE_KEY).unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_upgrade_makes_access_unlimited() {
        let api = Arc::new(FakeApi::new(Plan::Free, 0));
        let gate = signed_in_gate(api.clone());

        assert!(!gate.check_access().await.unwrap().allowed);
        assert!(gate.upgrade_plan().await.unwrap().is_unlimited());
        assert!(gate.check_access().await.unwrap().is_unlimited());
        assert_eq!(api.access_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upgrade_requires_sign_in() {
        let gate = gate(Arc::new(FakeApi::new(Plan::Free, 0)));
        let err = gate.upgrade_plan().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_profile_refreshes_decision() {
        let gate = signed_in_gate(Arc::new(FakeApi::new(Plan::Free, 12)));

        let profile = gate.profile().await.unwrap();
        assert_eq!(profile.account.email, "dev@example.com");
        assert_eq!(profile.account.plan, Plan::Free);
        assert_eq!(profile.decision, EntitlementDecision::metered(12));
        assert_eq!(gate.last_decision().await, Some(EntitlementDecision::metered(12)));
    }

    #[tokio::test]
    async fn test_redirect_to_upgrade_uses_pricing_route() {
        let navigator = Arc::new(RecordingNavigator::default());
        let gate = gate(Arc::new(FakeApi::new(Plan::Free, 1))).with_navigator(navigator.clone());

        gate.redirect_to_upgrade();
        assert_eq!(*navigator.0.lock().unwrap(), vec!["/pricing".to_string()]);
    }

    #[tokio::test]
    async fn test_teardown_discards_results() {
        let store = MemoryStore::new();
        let api = Arc::new(FakeApi::new(Plan::Free, 3));
        let gate = EntitlementClient::new(config(), api, store.clone());

        gate.teardown();
        assert!(matches!(gate.check_access().await, Err(GateError::Cancelled)));
        assert!(matches!(gate.record_usage(Tool::Ocr).await, Err(GateError::Cancelled)));
        assert_eq!(gate.last_decision().await, None);
        assert!(store.is_empty());
    }
}
