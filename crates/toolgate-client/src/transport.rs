//! HTTP transport to the entitlement server
//!
//! [`EntitlementApi`] is the seam between the gate and the network; tests and
//! embedders can supply their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use toolgate_types::api::{
    ErrorResponse, ProfileResponse, ToolAccessResponse, ToolUsageRequest, ToolUsageResponse,
    UpgradeResponse, CODE_LIMIT_REACHED, TOOL_ACCESS_PATH, TOOL_USAGE_PATH, UPGRADE_PLAN_PATH,
    USER_PROFILE_PATH,
};
use toolgate_types::ToolName;
use tracing::instrument;

use crate::config::{Credential, GateConfig};
use crate::error::{GateError, Result};
use crate::metrics::{Endpoint, RequestTimer, Status};

/// Calls against the entitlement server contract.
#[async_trait]
pub trait EntitlementApi: Send + Sync {
    /// `GET /api/tool-access`
    async fn tool_access(&self, credential: &Credential) -> Result<ToolAccessResponse>;

    /// `POST /api/tool-usage`
    async fn record_tool_usage(
        &self,
        credential: &Credential,
        tool: &ToolName,
    ) -> Result<ToolUsageResponse>;

    /// `GET /api/user-profile`
    async fn user_profile(&self, credential: &Credential) -> Result<ProfileResponse>;

    /// `POST /api/upgrade-plan`
    async fn upgrade_plan(&self, credential: &Credential) -> Result<UpgradeResponse>;
}

/// reqwest-backed [`EntitlementApi`].
#[derive(Debug, Clone)]
pub struct HttpEntitlementApi {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpEntitlementApi {
    /// Build a transport from the client configuration.
    pub fn new(config: &GateConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("toolgate-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GateError::connection(e.to_string(), false))?;

        Ok(Self::with_client(config, http))
    }

    /// Build a transport around an existing HTTP client.
    pub fn with_client(config: &GateConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.endpoint().to_string(),
            request_timeout: config.request_timeout(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let timer = RequestTimer::start(endpoint);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                timer.finish(Status::Timeout);
                return Err(GateError::Timeout(self.request_timeout));
            }
            Err(e) => {
                timer.finish(Status::Error);
                return Err(e.into());
            }
        };

        match decode(response).await {
            Ok(body) => {
                timer.finish(Status::Success);
                Ok(body)
            }
            Err(e) => {
                timer.finish(Status::Error);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl EntitlementApi for HttpEntitlementApi {
    #[instrument(skip_all, level = "debug")]
    async fn tool_access(&self, credential: &Credential) -> Result<ToolAccessResponse> {
        let request = self
            .http
            .get(self.url(TOOL_ACCESS_PATH))
            .bearer_auth(credential.expose());
        self.send(Endpoint::ToolAccess, request).await
    }

    #[instrument(skip_all, fields(tool = %tool), level = "debug")]
    async fn record_tool_usage(
        &self,
        credential: &Credential,
        tool: &ToolName,
    ) -> Result<ToolUsageResponse> {
        let request = self
            .http
            .post(self.url(TOOL_USAGE_PATH))
            .bearer_auth(credential.expose())
            .json(&ToolUsageRequest {
                tool_name: tool.clone(),
            });
        self.send(Endpoint::ToolUsage, request).await
    }

    #[instrument(skip_all, level = "debug")]
    async fn user_profile(&self, credential: &Credential) -> Result<ProfileResponse> {
        let request = self
            .http
            .get(self.url(USER_PROFILE_PATH))
            .bearer_auth(credential.expose());
        self.send(Endpoint::UserProfile, request).await
    }

    #[instrument(skip_all, level = "debug")]
    async fn upgrade_plan(&self, credential: &Credential) -> Result<UpgradeResponse> {
        let request = self
            .http
            .post(self.url(UPGRADE_PLAN_PATH))
            .bearer_auth(credential.expose());
        self.send(Endpoint::UpgradePlan, request).await
    }
}

/// Map a response to a body or to the error taxonomy.
///
/// 401 is always an authentication failure, never a quota denial. Only a 403
/// carrying `LIMIT_REACHED` is a quota denial; everything else fails closed as
/// a transport error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| GateError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).ok().map(|r| r.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    match status {
        StatusCode::UNAUTHORIZED => Err(GateError::Unauthenticated(message)),
        StatusCode::FORBIDDEN
            if detail.as_ref().is_some_and(|d| d.code == CODE_LIMIT_REACHED) =>
        {
            Err(GateError::QuotaExceeded(message))
        }
        _ => Err(GateError::Server {
            status: status.as_u16(),
            message,
        }),
    }
}
