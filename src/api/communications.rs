//! Templates, communication logs and notification rules.

use std::collections::BTreeMap;

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath, AppQuery},
};
use crate::{
    core::{
        communication::{
            self, NewCommunicationLog, NewNotificationRule, NewTemplate, RenderedTemplate,
            TemplateFilter,
        },
        tenant::TenantContext,
    },
    entities::{communication_log, communication_template, notification_rule},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Optional filters for the communication log
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    project_id: Option<i64>,
}

/// Variables substituted into a template
#[derive(Debug, Default, Deserialize)]
pub struct RenderBody {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Message templates.
pub async fn list_templates(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(filter): AppQuery<TemplateFilter>,
) -> ApiResult<Json<Vec<communication_template::Model>>> {
    ctx.require("communications:read")?;
    Ok(Json(communication::list_templates(&state.db, &ctx, &filter).await?))
}

/// Adds a message template.
pub async fn create_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewTemplate>,
) -> ApiResult<(StatusCode, Json<communication_template::Model>)> {
    ctx.require("communications:write")?;
    let created = communication::create_template(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Renders a template with the given variables.
pub async fn render_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(template_id): AppPath<i64>,
    AppJson(body): AppJson<RenderBody>,
) -> ApiResult<Json<RenderedTemplate>> {
    ctx.require("communications:read")?;
    Ok(Json(
        communication::render_template(&state.db, &ctx, template_id, &body.values).await?,
    ))
}

/// Logged communications, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<LogQuery>,
) -> ApiResult<Json<Vec<communication_log::Model>>> {
    ctx.require("communications:read")?;
    Ok(Json(
        communication::list_communication_logs(&state.db, &ctx, query.project_id).await?,
    ))
}

/// Records an outbound or inbound communication.
pub async fn create_log(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewCommunicationLog>,
) -> ApiResult<(StatusCode, Json<communication_log::Model>)> {
    ctx.require("communications:write")?;
    let created = communication::log_communication(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Notification rules.
pub async fn list_rules(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<notification_rule::Model>>> {
    ctx.require("communications:read")?;
    Ok(Json(communication::list_notification_rules(&state.db, &ctx).await?))
}

/// Adds a notification rule.
pub async fn create_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewNotificationRule>,
) -> ApiResult<(StatusCode, Json<notification_rule::Model>)> {
    ctx.require("communications:write")?;
    let created = communication::create_notification_rule(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Flips a notification rule on or off.
pub async fn toggle_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(rule_id): AppPath<i64>,
) -> ApiResult<Json<notification_rule::Model>> {
    ctx.require("communications:write")?;
    Ok(Json(
        communication::toggle_notification_rule(&state.db, &ctx, rule_id).await?,
    ))
}
