//! Social content generation and its queue.

use super::{ApiResult, AppState, extract::AppJson};
use crate::{
    core::{
        content::{self, GenerateContentRequest, GenerationReport},
        tenant::TenantContext,
    },
    entities::{social_post, social_post_queue},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Body of `POST /api/social-post-queue`
#[derive(Debug, Default, Deserialize)]
pub struct EnqueueBody {
    #[serde(default)]
    trigger_type: Option<String>,
}

/// `POST /functions/generate-social-content`
///
/// Called by schedulers and other services, so the company comes from the body.
pub async fn generate(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateContentRequest>,
) -> ApiResult<Json<GenerationReport>> {
    let report = content::generate_social_content(
        &state.db,
        state.llm.as_ref(),
        &state.webhooks,
        &state.config.content.default_platforms,
        request,
    )
    .await?;
    Ok(Json(report))
}

/// Generated posts, newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<social_post::Model>>> {
    ctx.require("content:read")?;
    Ok(Json(content::list_social_posts(&state.db, &ctx).await?))
}

/// Queued generation runs, newest first.
pub async fn list_queue(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<social_post_queue::Model>>> {
    ctx.require("content:read")?;
    Ok(Json(content::list_queue(&state.db, &ctx).await?))
}

/// Queues a generation run for a trigger.
pub async fn enqueue(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(body): AppJson<EnqueueBody>,
) -> ApiResult<(StatusCode, Json<social_post_queue::Model>)> {
    ctx.require("content:write")?;
    let trigger = body
        .trigger_type
        .as_deref()
        .unwrap_or(content::DEFAULT_TRIGGER);
    let queued = content::enqueue_generation(&state.db, &ctx, trigger).await?;
    Ok((StatusCode::CREATED, Json(queued)))
}
