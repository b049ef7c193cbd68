//! Shared test utilities for entitlement client tests
//!
//! Provides a wiremock-backed entitlement server, a navigator that records
//! routes, and a configuration tuned for fast tests.

pub mod entitlement_mock;

use std::sync::Mutex;
use std::time::Duration;

use toolgate_client::{GateConfig, Navigator, RetryConfig};

pub use entitlement_mock::EntitlementMockServer;

/// Bearer token the mock server accepts
pub const TEST_TOKEN: &str = "test-token-abc";

/// Configuration pointing at `url` with retries disabled
pub fn test_config(url: &str) -> GateConfig {
    GateConfig::builder()
        .endpoint(url)
        .retry(RetryConfig::disabled())
        .check_timeout(Duration::from_secs(2))
        .request_timeout(Duration::from_secs(2))
        .build()
        .expect("valid test config")
}

/// Navigator that remembers every requested route
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[allow(dead_code)]
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}
