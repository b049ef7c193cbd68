//! Mock entitlement server for integration testing

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toolgate_types::api::{
    CODE_INVALID_TOKEN, CODE_LIMIT_REACHED, TOOL_ACCESS_PATH, TOOL_USAGE_PATH, UPGRADE_PLAN_PATH,
    USER_PROFILE_PATH,
};

use super::TEST_TOKEN;

/// Entitlement server double speaking the HTTP contract
pub struct EntitlementMockServer {
    server: MockServer,
}

#[allow(dead_code)]
impl EntitlementMockServer {
    /// Start an empty mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL (without trailing slash)
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Underlying wiremock server, for one-off mocks
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Access check answers for a free account with `remaining` uses
    pub async fn free_access(&self, remaining: u32) {
        self.access(200, access_body(remaining > 0, Some(remaining), "free"), None)
            .await;
    }

    /// Access check answers for a free account, once
    pub async fn free_access_once(&self, remaining: u32) {
        self.access(200, access_body(remaining > 0, Some(remaining), "free"), Some(1))
            .await;
    }

    /// Access check answers for a pro account, expecting exactly `calls`
    pub async fn pro_access(&self, calls: u64) {
        Mock::given(method("GET"))
            .and(path(TOOL_ACCESS_PATH))
            .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(access_body(true, None, "pro")),
            )
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Access check answers with an arbitrary status and body
    pub async fn access(&self, status: u16, body: Value, times: Option<u64>) {
        let mut mock = Mock::given(method("GET"))
            .and(path(TOOL_ACCESS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body));
        if let Some(times) = times {
            mock = mock.up_to_n_times(times);
        }
        mock.mount(&self.server).await;
    }

    /// Access check that only answers after `delay`
    pub async fn slow_access(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(TOOL_ACCESS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(access_body(true, Some(10), "free"))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Access check rejects the credential
    pub async fn access_unauthorized(&self) {
        self.access(401, error_body(CODE_INVALID_TOKEN, "Token expired"), None)
            .await;
    }

    /// Usage recording accepted, leaving `remaining` uses
    pub async fn usage_accepted(&self, remaining: u32, times: Option<u64>) {
        self.usage(
            200,
            json!({"remainingUses": remaining, "plan": "free"}),
            times,
        )
        .await;
    }

    /// Usage recording rejected because the limit was already reached
    pub async fn usage_limit_reached(&self) {
        self.usage(
            403,
            error_body(CODE_LIMIT_REACHED, "No uses remaining"),
            None,
        )
        .await;
    }

    /// Usage recording answers with an arbitrary status and body
    pub async fn usage(&self, status: u16, body: Value, times: Option<u64>) {
        let mut mock = Mock::given(method("POST"))
            .and(path(TOOL_USAGE_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body));
        if let Some(times) = times {
            mock = mock.up_to_n_times(times);
        }
        mock.mount(&self.server).await;
    }

    /// Usage recording must never be called
    pub async fn usage_forbidden(&self) {
        Mock::given(method("POST"))
            .and(path(TOOL_USAGE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Profile of a free account
    pub async fn profile(&self, email: &str, plan: &str, remaining: Option<u32>) {
        Mock::given(method("GET"))
            .and(path(USER_PROFILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "acct-42",
                "email": email,
                "plan": plan,
                "remainingUses": remaining,
            })))
            .mount(&self.server)
            .await;
    }

    /// Upgrade succeeds
    pub async fn upgrade(&self) {
        Mock::given(method("POST"))
            .and(path(UPGRADE_PLAN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"plan": "pro", "previousPlan": "free"})),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Number of requests received on `request_path`
    pub async fn hits(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    /// Total number of requests received
    pub async fn total_hits(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .len()
    }
}

/// `GET /api/tool-access` body
pub fn access_body(allowed: bool, remaining: Option<u32>, plan: &str) -> Value {
    json!({"allowed": allowed, "remainingUses": remaining, "plan": plan})
}

/// Error body shared by every endpoint
pub fn error_body(code: &str, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}
