//! Audit trail, GDPR requests, retention and compliance reports.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath, AppQuery},
};
use crate::{
    core::{
        audit::{self, AuditLogFilter},
        compliance::{self, NewComplianceReport, NewGdprRequest, NewRetentionPolicy, RetentionRun},
        tenant::TenantContext,
    },
    entities::{
        audit_log, compliance_report, data_retention_policy,
        gdpr_request::{self, GdprRequestStatus},
    },
};
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

/// File name offered by the CSV export
pub const AUDIT_EXPORT_FILENAME: &str = "audit-logs.csv";

/// Optional status filter for GDPR requests
#[derive(Debug, Deserialize)]
pub struct GdprQuery {
    status: Option<GdprRequestStatus>,
}

/// Target status and optional note for a GDPR request
#[derive(Debug, Deserialize)]
pub struct GdprTransitionBody {
    status: GdprRequestStatus,
    #[serde(default)]
    notes: Option<String>,
}

/// Body of `PUT /api/retention-policies/:id/active`
#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    is_active: bool,
}

/// Audit trail, newest first.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(filter): AppQuery<AuditLogFilter>,
) -> ApiResult<Json<Vec<audit_log::Model>>> {
    ctx.require("compliance:read")?;
    Ok(Json(audit::list_audit_logs(&state.db, &ctx, &filter).await?))
}

/// Audit trail as a CSV download.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(filter): AppQuery<AuditLogFilter>,
) -> ApiResult<impl IntoResponse> {
    ctx.require("compliance:read")?;
    let logs = audit::list_audit_logs(&state.db, &ctx, &filter).await?;
    let body = audit::export_csv(&logs)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{AUDIT_EXPORT_FILENAME}\""),
            ),
        ],
        body,
    ))
}

/// GDPR requests, optionally filtered by status.
pub async fn list_gdpr_requests(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<GdprQuery>,
) -> ApiResult<Json<Vec<gdpr_request::Model>>> {
    ctx.require("compliance:read")?;
    Ok(Json(
        compliance::list_gdpr_requests(&state.db, &ctx, query.status).await?,
    ))
}

/// Opens a GDPR request.
pub async fn create_gdpr_request(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewGdprRequest>,
) -> ApiResult<(StatusCode, Json<gdpr_request::Model>)> {
    ctx.require("compliance:write")?;
    let created = compliance::create_gdpr_request(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Moves a GDPR request through its lifecycle.
pub async fn transition_gdpr_request(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(request_id): AppPath<i64>,
    AppJson(body): AppJson<GdprTransitionBody>,
) -> ApiResult<Json<gdpr_request::Model>> {
    ctx.require("compliance:write")?;
    Ok(Json(
        compliance::transition_gdpr_request(&state.db, &ctx, request_id, body.status, body.notes)
            .await?,
    ))
}

/// Retention policies.
pub async fn list_retention_policies(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<data_retention_policy::Model>>> {
    ctx.require("compliance:read")?;
    Ok(Json(compliance::list_retention_policies(&state.db, &ctx).await?))
}

/// Adds a retention policy.
pub async fn create_retention_policy(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewRetentionPolicy>,
) -> ApiResult<(StatusCode, Json<data_retention_policy::Model>)> {
    ctx.require("compliance:write")?;
    let created = compliance::create_retention_policy(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Enables or disables a retention policy.
pub async fn set_retention_policy_active(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(policy_id): AppPath<i64>,
    AppJson(body): AppJson<ActiveBody>,
) -> ApiResult<Json<data_retention_policy::Model>> {
    ctx.require("compliance:write")?;
    Ok(Json(
        compliance::set_retention_policy_active(&state.db, &ctx, policy_id, body.is_active).await?,
    ))
}

/// Deletes records older than each active policy allows.
pub async fn apply_retention(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<RetentionRun>>> {
    ctx.require("compliance:write")?;
    Ok(Json(compliance::apply_retention_policies(&state.db, &ctx).await?))
}

/// Generated compliance reports.
pub async fn list_reports(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<compliance_report::Model>>> {
    ctx.require("compliance:read")?;
    Ok(Json(compliance::list_compliance_reports(&state.db, &ctx).await?))
}

/// Builds and stores a compliance report.
pub async fn generate_report(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewComplianceReport>,
) -> ApiResult<(StatusCode, Json<compliance_report::Model>)> {
    ctx.require("compliance:write")?;
    let created = compliance::generate_compliance_report(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
