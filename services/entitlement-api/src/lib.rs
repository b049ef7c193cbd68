//! Entitlement API
//!
//! Authoritative plan and usage counter per account, served over the
//! tool-access HTTP contract:
//!
//! - `GET  /api/tool-access`  - current decision
//! - `POST /api/tool-usage`   - count one use (atomic check-and-increment)
//! - `GET  /api/user-profile` - account details
//! - `POST /api/upgrade-plan` - move to pro
//! - `GET  /health`           - liveness

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use toolgate_types::api::{TOOL_ACCESS_PATH, TOOL_USAGE_PATH, UPGRADE_PLAN_PATH, USER_PROFILE_PATH};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use state::AppState;

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    build_router(state, None)
}

/// Build the HTTP router, exposing `/metrics` when a handle is given
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api = Router::new()
        .route(TOOL_ACCESS_PATH, get(handlers::tool_access))
        .route(TOOL_USAGE_PATH, post(handlers::record_tool_usage))
        .route(USER_PROFILE_PATH, get(handlers::user_profile))
        .route(UPGRADE_PLAN_PATH, post(handlers::upgrade_plan));

    // Health route (no timeout - must always respond quickly)
    let health_routes = Router::new().route("/health", get(handlers::health));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // The gate runs in the browser on another origin
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(api)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
