//! Quality inspections.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath, AppQuery},
};
use crate::{
    core::{
        inspection::{self, ChecklistItemUpdate, InspectionFilter, NewDeficiency, NewInspection},
        tenant::TenantContext,
    },
    entities::quality_inspection::{self, InspectionStatus},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Target status for an inspection
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    status: InspectionStatus,
}

/// All inspections for the company.
pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(filter): AppQuery<InspectionFilter>,
) -> ApiResult<Json<Vec<quality_inspection::Model>>> {
    ctx.require("quality:read")?;
    Ok(Json(inspection::list_inspections(&state.db, &ctx, &filter).await?))
}

/// Schedules an inspection with its checklist.
pub async fn create(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewInspection>,
) -> ApiResult<(StatusCode, Json<quality_inspection::Model>)> {
    ctx.require("quality:write")?;
    let created = inspection::create_inspection(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/inspections/:id`
pub async fn get(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(inspection_id): AppPath<i64>,
) -> ApiResult<Json<quality_inspection::Model>> {
    ctx.require("quality:read")?;
    Ok(Json(inspection::get_inspection(&state.db, &ctx, inspection_id).await?))
}

/// Moves an inspection through its lifecycle.
pub async fn transition(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(inspection_id): AppPath<i64>,
    AppJson(body): AppJson<TransitionBody>,
) -> ApiResult<Json<quality_inspection::Model>> {
    ctx.require("quality:write")?;
    Ok(Json(
        inspection::transition_inspection(&state.db, &ctx, inspection_id, body.status).await?,
    ))
}

/// Records the result of one checklist item.
pub async fn update_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((inspection_id, item_id)): AppPath<(i64, String)>,
    AppJson(update): AppJson<ChecklistItemUpdate>,
) -> ApiResult<Json<quality_inspection::Model>> {
    ctx.require("quality:write")?;
    Ok(Json(
        inspection::update_checklist_item(&state.db, &ctx, inspection_id, &item_id, update).await?,
    ))
}

/// Logs a deficiency found during an inspection.
pub async fn add_deficiency(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(inspection_id): AppPath<i64>,
    AppJson(input): AppJson<NewDeficiency>,
) -> ApiResult<(StatusCode, Json<quality_inspection::Model>)> {
    ctx.require("quality:write")?;
    let updated = inspection::add_deficiency(&state.db, &ctx, inspection_id, input).await?;
    Ok((StatusCode::CREATED, Json(updated)))
}

/// Marks a deficiency resolved.
pub async fn resolve_deficiency(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((inspection_id, deficiency_id)): AppPath<(i64, String)>,
) -> ApiResult<Json<quality_inspection::Model>> {
    ctx.require("quality:write")?;
    Ok(Json(
        inspection::resolve_deficiency(&state.db, &ctx, inspection_id, &deficiency_id).await?,
    ))
}
