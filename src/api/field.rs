//! Geofences and field reports.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath},
};
use crate::{
    core::{
        geofence::{self, GeoPoint, GeofenceCheck, NewFieldReport, NewGeofence},
        tenant::TenantContext,
    },
    entities::{field_report, geofence as geofence_entity},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Body of `PUT /api/geofences/:id/active`
#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    is_active: bool,
}

/// Geofences drawn around a project site.
pub async fn list_geofences(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<geofence_entity::Model>>> {
    ctx.require("field:read")?;
    Ok(Json(geofence::list_geofences(&state.db, &ctx, project_id).await?))
}

/// Adds a geofence to a project.
pub async fn create_geofence(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewGeofence>,
) -> ApiResult<(StatusCode, Json<geofence_entity::Model>)> {
    ctx.require("field:write")?;
    let created = geofence::create_geofence(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Enables or disables a geofence.
pub async fn set_active(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(geofence_id): AppPath<i64>,
    AppJson(body): AppJson<ActiveBody>,
) -> ApiResult<Json<geofence_entity::Model>> {
    ctx.require("field:write")?;
    Ok(Json(
        geofence::set_geofence_active(&state.db, &ctx, geofence_id, body.is_active).await?,
    ))
}

/// Tells whether a position falls inside a geofence.
pub async fn check(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(geofence_id): AppPath<i64>,
    AppJson(point): AppJson<GeoPoint>,
) -> ApiResult<Json<GeofenceCheck>> {
    ctx.require("field:read")?;
    let point = GeoPoint::new(point.latitude, point.longitude)?;
    let fence = geofence::get_geofence(&state.db, &ctx, geofence_id).await?;
    Ok(Json(geofence::check_location(&fence, point)))
}

/// Field reports filed for a project.
pub async fn list_reports(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<field_report::Model>>> {
    ctx.require("field:read")?;
    Ok(Json(geofence::list_field_reports(&state.db, &ctx, project_id).await?))
}

/// Files a field report, checked against the project's geofences.
pub async fn submit_report(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewFieldReport>,
) -> ApiResult<(StatusCode, Json<field_report::Model>)> {
    ctx.require("field:write")?;
    let created = geofence::submit_field_report(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
