//! Risk assessments and alerts.

use super::{ApiResult, AppState, extract::AppPath};
use crate::{
    core::{
        risk::{self, AssessmentOutcome},
        tenant::TenantContext,
    },
    entities::{risk_alert, risk_prediction},
};
use axum::{Json, extract::State, http::StatusCode};

/// Scores a project's risk and raises alerts for high findings.
pub async fn assess(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<(StatusCode, Json<AssessmentOutcome>)> {
    ctx.require("risk:write")?;
    let outcome =
        risk::assess_project_risk(&state.db, &ctx, state.llm.as_ref(), project_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Past risk assessments for a project.
pub async fn list_predictions(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<risk_prediction::Model>>> {
    ctx.require("risk:read")?;
    Ok(Json(risk::list_predictions(&state.db, &ctx, project_id).await?))
}

/// Unacknowledged risk alerts, newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<risk_alert::Model>>> {
    ctx.require("risk:read")?;
    Ok(Json(risk::list_open_alerts(&state.db, &ctx).await?))
}

/// Acknowledges a risk alert.
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(alert_id): AppPath<i64>,
) -> ApiResult<Json<risk_alert::Model>> {
    ctx.require("risk:write")?;
    Ok(Json(risk::acknowledge_alert(&state.db, &ctx, alert_id).await?))
}
