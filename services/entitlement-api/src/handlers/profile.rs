//! Profile and plan handlers

use axum::extract::State;
use axum::Json;
use toolgate_types::api::{ProfileResponse, UpgradeResponse};
use toolgate_types::Plan;

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::metrics;
use crate::state::AppState;

/// GET /api/user-profile
pub async fn user_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let account = state
        .accounts
        .get_or_create(&auth_user.account_id, &auth_user.email)
        .await?;

    Ok(Json(ProfileResponse {
        remaining_uses: account.decision(state.free_limit()).remaining,
        id: account.id,
        email: account.email,
        plan: account.plan,
    }))
}

/// POST /api/upgrade-plan
///
/// Moves the caller to the pro plan. No payment is taken; upgrading a pro
/// account is a no-op.
pub async fn upgrade_plan(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UpgradeResponse>> {
    state
        .accounts
        .get_or_create(&auth_user.account_id, &auth_user.email)
        .await?;

    let (previous_plan, account) = state
        .accounts
        .set_plan(&auth_user.account_id, Plan::Pro)
        .await?;

    if previous_plan != Plan::Pro {
        tracing::info!(account = %account.id, "account upgraded to pro");
        metrics::record_upgrade();
    }

    Ok(Json(UpgradeResponse {
        plan: account.plan,
        previous_plan,
    }))
}
