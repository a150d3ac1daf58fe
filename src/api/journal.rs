//! Journal entries.

use super::{
    ApiResult, AppState,
    extract::{AppJson, AppPath},
};
use crate::{
    core::{
        journal::{self, BalanceCheck, JournalEntryWithLines, JournalLine, NewJournalEntry},
        tenant::TenantContext,
    },
    entities::journal_entry,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Lines to check without storing
#[derive(Debug, Deserialize)]
pub struct BalanceBody {
    lines: Vec<JournalLine>,
}

/// Journal entries, newest first.
pub async fn list_entries(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<Vec<journal_entry::Model>>> {
    ctx.require("finance:read")?;
    Ok(Json(journal::list_journal_entries(&state.db, &ctx).await?))
}

/// Posts a balanced journal entry.
pub async fn create_entry(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(input): AppJson<NewJournalEntry>,
) -> ApiResult<(StatusCode, Json<JournalEntryWithLines>)> {
    ctx.require("finance:write")?;
    let created = journal::create_journal_entry(&state.db, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/journal-entries/:id`
pub async fn get_entry(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(entry_id): AppPath<i64>,
) -> ApiResult<Json<JournalEntryWithLines>> {
    ctx.require("finance:read")?;
    Ok(Json(journal::get_journal_entry(&state.db, &ctx, entry_id).await?))
}

/// Balance preview for an entry being composed. Nothing is stored.
pub async fn check_balance(
    ctx: TenantContext,
    AppJson(body): AppJson<BalanceBody>,
) -> ApiResult<Json<BalanceCheck>> {
    ctx.require("finance:read")?;
    Ok(Json(journal::check_balance(&body.lines)))
}
