//! Access check handler

use axum::extract::State;
use axum::Json;
use toolgate_types::api::ToolAccessResponse;

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/tool-access
///
/// Current decision for the caller. Provisions a free account on first use.
pub async fn tool_access(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<ToolAccessResponse>> {
    let account = state
        .accounts
        .get_or_create(&auth_user.account_id, &auth_user.email)
        .await?;

    let decision = account.decision(state.free_limit());
    tracing::debug!(
        account = %account.id,
        plan = %account.plan,
        allowed = decision.allowed,
        "access checked"
    );

    Ok(Json(ToolAccessResponse::new(decision, account.plan)))
}
