//! API keys, webhooks and the AI model catalogue.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath},
};
use crate::{
    core::{
        ai_model::{self, NewAiModel},
        api_key::{self, CreatedApiKey, NewApiKey},
        tenant::{PLATFORM_ADMIN, TenantContext},
        webhook::{self, NewWebhook},
    },
    entities::{ai_model_configuration, api_key as api_key_entity, webhook as webhook_entity},
};
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

/// Lists the company's API keys without their secrets.
pub async fn list_api_keys(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<api_key_entity::Model>>> {
    ctx.require("admin:read")?;
    Ok(Json(api_key::list_api_keys(&state.db, &ctx).await?))
}

/// Issues a key; the plaintext secret is in this response only.
pub async fn create_api_key(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewApiKey>,
) -> ApiResult<(StatusCode, Json<CreatedApiKey>)> {
    ctx.require("admin:write")?;
    let created = api_key::create_api_key(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Revokes a key so it stops authenticating.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(key_id): AppPath<i64>,
) -> ApiResult<Json<api_key_entity::Model>> {
    ctx.require("admin:write")?;
    Ok(Json(api_key::revoke_api_key(&state.db, &ctx, key_id).await?))
}

/// Lists registered webhooks.
pub async fn list_webhooks(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<webhook_entity::Model>>> {
    ctx.require("admin:read")?;
    Ok(Json(webhook::list_webhooks(&state.db, &ctx).await?))
}

/// Registers a webhook endpoint.
pub async fn create_webhook(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewWebhook>,
) -> ApiResult<(StatusCode, Json<webhook_entity::Model>)> {
    ctx.require("admin:write")?;
    let created = webhook::create_webhook(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Removes a webhook.
pub async fn delete_webhook(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(webhook_id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    ctx.require("admin:write")?;
    webhook::delete_webhook(&state.db, &ctx, webhook_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sends a test delivery to a webhook.
pub async fn ping_webhook(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(webhook_id): AppPath<i64>,
) -> ApiResult<Json<Value>> {
    ctx.require("admin:write")?;
    let delivered = webhook::send_test_ping(&state.db, &ctx, &state.webhooks, webhook_id).await?;
    Ok(Json(json!({ "delivered": delivered })))
}

/// `GET /api/ai-models`
pub async fn list_models(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<ai_model_configuration::Model>>> {
    ctx.require("admin:read")?;
    Ok(Json(ai_model::list_active_models(&state.db).await?))
}

/// Adds a catalogue entry. Platform administrators only.
pub async fn create_model(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewAiModel>,
) -> ApiResult<(StatusCode, Json<ai_model_configuration::Model>)> {
    ctx.require(PLATFORM_ADMIN)?;
    let created = ai_model::create_model(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Removes a catalogue entry that no alias points to. Platform administrators only.
pub async fn delete_model(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(model_id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    ctx.require(PLATFORM_ADMIN)?;
    ai_model::delete_model(&state.db, &ctx, model_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Makes a model its provider's default. Platform administrators only.
pub async fn set_default_model(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(model_id): AppPath<i64>,
) -> ApiResult<Json<ai_model_configuration::Model>> {
    ctx.require(PLATFORM_ADMIN)?;
    Ok(Json(ai_model::set_default(&state.db, &ctx, model_id).await?))
}

/// Follows an alias to the concrete model it names.
pub async fn resolve_model(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(name): AppPath<String>,
) -> ApiResult<Json<ai_model_configuration::Model>> {
    ctx.require("admin:read")?;
    Ok(Json(ai_model::resolve_model(&state.db, &name).await?))
}
