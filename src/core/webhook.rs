//! Registered webhook endpoints.

use crate::{
    core::{audit, tenant::TenantContext, validate},
    entities::{StringList, Webhook, webhook},
    errors::{Error, Result},
    integrations::WebhookDispatcher,
};
use chrono::{SecondsFormat, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use serde_json::json;

/// Input for [`create_webhook`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewWebhook {
    /// Label
    pub name: String,
    /// Destination
    pub url: String,
    /// Subscribed events
    #[serde(default)]
    pub events: Vec<String>,
}

/// Registers an endpoint.
pub async fn create_webhook(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewWebhook,
) -> Result<webhook::Model> {
    let name = validate::require_text("Webhook name", &input.name)?;
    let url = validate::require_http_url(&input.url)?;
    let events = input
        .events
        .iter()
        .map(|e| validate::require_text("Event", e))
        .collect::<Result<Vec<_>>>()?;

    let hook = webhook::ActiveModel {
        company_id: Set(ctx.company_id),
        name: Set(name),
        url: Set(url),
        events: Set(StringList(events)),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(db, ctx, "webhook.create", "webhook", Some(hook.id.to_string()), None).await?;
    Ok(hook)
}

/// The caller's endpoints.
pub async fn list_webhooks(db: &DatabaseConnection, ctx: &TenantContext) -> Result<Vec<webhook::Model>> {
    Webhook::find()
        .filter(webhook::Column::CompanyId.eq(ctx.company_id))
        .order_by_asc(webhook::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one endpoint.
pub async fn get_webhook(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    webhook_id: i64,
) -> Result<webhook::Model> {
    Webhook::find_by_id(webhook_id)
        .filter(webhook::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("webhook", webhook_id))
}

/// Removes an endpoint.
pub async fn delete_webhook(db: &DatabaseConnection, ctx: &TenantContext, webhook_id: i64) -> Result<()> {
    let hook = get_webhook(db, ctx, webhook_id).await?;
    hook.delete(db).await?;
    audit::record(db, ctx, "webhook.delete", "webhook", Some(webhook_id.to_string()), None).await?;
    Ok(())
}

/// Sends a `ping` event; returns whether the endpoint answered 2xx.
pub async fn send_test_ping(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    dispatcher: &WebhookDispatcher,
    webhook_id: i64,
) -> Result<bool> {
    let hook = get_webhook(db, ctx, webhook_id).await?;
    let payload = json!({
        "event": "ping",
        "webhook_id": hook.id,
        "company_id": hook.company_id,
        "sent_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    });
    Ok(dispatcher.dispatch(&hook.url, &payload).await)
}

/// Active endpoints subscribed to `event`.
pub async fn webhooks_for_event(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    event: &str,
) -> Result<Vec<webhook::Model>> {
    Ok(list_webhooks(db, ctx)
        .await?
        .into_iter()
        .filter(|hook| hook.is_active && hook.events.contains(event))
        .collect())
}
