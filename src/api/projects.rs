//! Projects, job costs, invoices, expenses and the dashboard.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath, AppQuery},
};
use crate::{
    core::{
        finance::{self, CompanyDashboard, NewExpense, NewInvoice, NewJobCost, ProjectFinancials},
        project::{self, NewProject},
        tenant::TenantContext,
    },
    entities::{
        expense, invoice::{self, InvoiceStatus}, job_cost,
        project::{self as project_entity, ProjectStatus},
    },
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Optional status filter for the project list
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    status: Option<ProjectStatus>,
}

/// Body carrying a target status
#[derive(Debug, Deserialize)]
pub struct StatusBody<S> {
    status: S,
}

/// Body of `PUT /api/projects/:id/completion`
#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    completion_percentage: f64,
}

/// Lists projects, optionally filtered by status.
pub async fn list_projects(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<ProjectQuery>,
) -> ApiResult<Json<Vec<project_entity::Model>>> {
    ctx.require("projects:read")?;
    Ok(Json(project::list_projects(&state.db, &ctx, query.status).await?))
}

/// Creates a project.
pub async fn create_project(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewProject>,
) -> ApiResult<(StatusCode, Json<project_entity::Model>)> {
    ctx.require("projects:write")?;
    let created = project::create_project(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<project_entity::Model>> {
    ctx.require("projects:read")?;
    Ok(Json(project::get_project(&*state.db, &ctx, project_id).await?))
}

/// Moves a project through its lifecycle.
pub async fn update_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(body): AppJson<StatusBody<ProjectStatus>>,
) -> ApiResult<Json<project_entity::Model>> {
    ctx.require("projects:write")?;
    Ok(Json(
        project::update_project_status(&state.db, &ctx, project_id, body.status).await?,
    ))
}

/// Records how far along a project is.
pub async fn update_completion(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(body): AppJson<CompletionBody>,
) -> ApiResult<Json<project_entity::Model>> {
    ctx.require("projects:write")?;
    Ok(Json(
        project::update_completion(&state.db, &ctx, project_id, body.completion_percentage).await?,
    ))
}

/// Budget, cost and margin summary for one project.
pub async fn financials(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<ProjectFinancials>> {
    ctx.require("finance:read")?;
    Ok(Json(finance::project_financials(&state.db, &ctx, project_id).await?))
}

/// Company-wide project and finance totals.
pub async fn dashboard(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<CompanyDashboard>> {
    ctx.require("finance:read")?;
    Ok(Json(finance::company_dashboard(&state.db, &ctx).await?))
}

/// Job costs booked to a project.
pub async fn list_job_costs(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<job_cost::Model>>> {
    ctx.require("finance:read")?;
    Ok(Json(finance::list_job_costs(&state.db, &ctx, project_id).await?))
}

/// Books a job cost to a project.
pub async fn create_job_cost(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewJobCost>,
) -> ApiResult<(StatusCode, Json<job_cost::Model>)> {
    ctx.require("finance:write")?;
    let created = finance::create_job_cost(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Invoices raised against a project.
pub async fn list_invoices(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<invoice::Model>>> {
    ctx.require("finance:read")?;
    Ok(Json(finance::list_invoices(&state.db, &ctx, project_id).await?))
}

/// Issues an invoice for a project.
pub async fn create_invoice(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewInvoice>,
) -> ApiResult<(StatusCode, Json<invoice::Model>)> {
    ctx.require("finance:write")?;
    let created = finance::create_invoice(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Moves an invoice through its lifecycle.
pub async fn update_invoice_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(invoice_id): AppPath<i64>,
    AppJson(body): AppJson<StatusBody<InvoiceStatus>>,
) -> ApiResult<Json<invoice::Model>> {
    ctx.require("finance:write")?;
    Ok(Json(
        finance::update_invoice_status(&state.db, &ctx, invoice_id, body.status).await?,
    ))
}

/// Expenses recorded on a project.
pub async fn list_expenses(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
) -> ApiResult<Json<Vec<expense::Model>>> {
    ctx.require("finance:read")?;
    Ok(Json(finance::list_expenses(&state.db, &ctx, project_id).await?))
}

/// Records a project expense.
pub async fn create_expense(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(project_id): AppPath<i64>,
    AppJson(input): AppJson<NewExpense>,
) -> ApiResult<(StatusCode, Json<expense::Model>)> {
    ctx.require("finance:write")?;
    let created = finance::create_expense(&state.db, &ctx, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
