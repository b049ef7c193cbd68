//! Usage recording handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use toolgate_types::api::{ToolUsageRequest, ToolUsageResponse};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::metrics;
use crate::state::AppState;
use crate::store::{ConsumeOutcome, UsageEvent};

/// POST /api/tool-usage
///
/// Count one use for the caller. Rejected with `LIMIT_REACHED`, and nothing
/// counted, when a free account is already at the limit. Pro accounts are
/// logged but never counted.
pub async fn record_tool_usage(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Result<Json<ToolUsageRequest>, JsonRejection>,
) -> ApiResult<Json<ToolUsageResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    state
        .accounts
        .get_or_create(&auth_user.account_id, &auth_user.email)
        .await?;

    let account = match state
        .accounts
        .try_consume(&auth_user.account_id, state.free_limit())
        .await?
    {
        ConsumeOutcome::Recorded(account) => account,
        ConsumeOutcome::LimitReached(account) => {
            tracing::info!(
                account = %account.id,
                tool = %request.tool_name,
                "usage rejected at limit"
            );
            metrics::record_limit_rejection();
            return Err(ApiError::LimitReached);
        }
    };

    state
        .accounts
        .append_event(UsageEvent {
            account: account.id.clone(),
            tool: request.tool_name.clone(),
            plan: account.plan,
            at: Utc::now(),
        })
        .await?;
    metrics::record_usage(account.plan);

    let decision = account.decision(state.free_limit());
    tracing::info!(
        account = %account.id,
        tool = %request.tool_name,
        remaining = ?decision.remaining,
        "usage recorded"
    );

    Ok(Json(ToolUsageResponse {
        remaining_uses: decision.remaining,
        plan: account.plan,
    }))
}
