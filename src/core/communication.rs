//! Communication templates, the contact log and notification rules.

use crate::{
    core::{audit, project, tenant::TenantContext, validate},
    entities::{
        CommunicationLog, CommunicationTemplate, NotificationRule, StringList,
        communication_log::{self, Direction},
        communication_template::{self, TemplateType},
        notification_rule,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replaces every `{{key}}` marker whose key is in `values`.
///
/// Whitespace inside the braces is ignored. Unknown keys and unterminated
/// markers are copied through unchanged.
#[must_use]
pub fn render(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after_open[..end].trim();
        match values.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Input for [`create_template`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    /// Template name
    pub name: String,
    /// Grouping
    pub category: String,
    /// Medium
    pub template_type: TemplateType,
    /// Subject line
    #[serde(default)]
    pub subject: Option<String>,
    /// Body with markers
    pub body: String,
}

/// Creates an active template.
pub async fn create_template(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewTemplate,
) -> Result<communication_template::Model> {
    let name = validate::require_text("Template name", &input.name)?;
    let category = validate::require_text("Category", &input.category)?;
    let body = validate::require_text("Body", &input.body)?;

    let template = communication_template::ActiveModel {
        company_id: Set(ctx.company_id),
        name: Set(name),
        category: Set(category),
        template_type: Set(input.template_type),
        subject: Set(input.subject),
        body: Set(body),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "template.create",
        "communication_template",
        Some(template.id.to_string()),
        None,
    )
    .await?;
    Ok(template)
}

/// Optional filters for [`list_templates`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFilter {
    /// Only this category
    pub category: Option<String>,
    /// Only this medium
    pub template_type: Option<TemplateType>,
}

/// The caller's templates by name.
pub async fn list_templates(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    filter: &TemplateFilter,
) -> Result<Vec<communication_template::Model>> {
    let mut query = CommunicationTemplate::find()
        .filter(communication_template::Column::CompanyId.eq(ctx.company_id));
    if let Some(category) = &filter.category {
        query = query.filter(communication_template::Column::Category.eq(category.as_str()));
    }
    if let Some(template_type) = filter.template_type {
        query = query.filter(communication_template::Column::TemplateType.eq(template_type));
    }
    query
        .order_by_asc(communication_template::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Subject and body after substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
    /// Rendered subject
    pub subject: Option<String>,
    /// Rendered body
    pub body: String,
}

/// Renders one of the caller's templates.
pub async fn render_template(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    template_id: i64,
    values: &BTreeMap<String, String>,
) -> Result<RenderedTemplate> {
    let template = CommunicationTemplate::find_by_id(template_id)
        .filter(communication_template::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("template", template_id))?;

    Ok(RenderedTemplate {
        subject: template.subject.as_deref().map(|s| render(s, values)),
        body: render(&template.body, values),
    })
}

/// Input for [`log_communication`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewCommunicationLog {
    /// Related project
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Counterparty
    pub contact_name: String,
    /// Medium
    pub channel: String,
    /// Direction
    pub direction: Direction,
    /// Subject
    #[serde(default)]
    pub subject: Option<String>,
    /// Content
    pub body: String,
}

/// Records a conversation with a client, supplier or crew.
pub async fn log_communication(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewCommunicationLog,
) -> Result<communication_log::Model> {
    let contact_name = validate::require_text("Contact", &input.contact_name)?;
    let channel = validate::require_text("Channel", &input.channel)?;
    let body = validate::require_text("Body", &input.body)?;
    if let Some(project_id) = input.project_id {
        project::get_project(db, ctx, project_id).await?;
    }

    communication_log::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(input.project_id),
        contact_name: Set(contact_name),
        channel: Set(channel),
        direction: Set(input.direction),
        subject: Set(input.subject),
        body: Set(body),
        logged_by: Set(ctx.user_id.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// The caller's communication log, newest first.
pub async fn list_communication_logs(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: Option<i64>,
) -> Result<Vec<communication_log::Model>> {
    let mut query =
        CommunicationLog::find().filter(communication_log::Column::CompanyId.eq(ctx.company_id));
    if let Some(project_id) = project_id {
        query = query.filter(communication_log::Column::ProjectId.eq(project_id));
    }
    query
        .order_by_desc(communication_log::Column::CreatedAt)
        .order_by_desc(communication_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Input for [`create_notification_rule`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotificationRule {
    /// Rule name
    pub name: String,
    /// Triggering event
    pub event_type: String,
    /// Delivery channel
    pub channel: String,
    /// Recipients
    pub recipients: Vec<String>,
}

/// Creates an active notification rule.
pub async fn create_notification_rule(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewNotificationRule,
) -> Result<notification_rule::Model> {
    let name = validate::require_text("Rule name", &input.name)?;
    let event_type = validate::require_text("Event type", &input.event_type)?;
    let channel = validate::require_text("Channel", &input.channel)?;
    if input.recipients.is_empty() {
        return Err(Error::validation("A notification rule needs at least one recipient"));
    }
    let recipients = input
        .recipients
        .iter()
        .map(|r| validate::require_text("Recipient", r))
        .collect::<Result<Vec<_>>>()?;

    let rule = notification_rule::ActiveModel {
        company_id: Set(ctx.company_id),
        name: Set(name),
        event_type: Set(event_type),
        channel: Set(channel),
        recipients: Set(StringList(recipients)),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "notification_rule.create",
        "notification_rule",
        Some(rule.id.to_string()),
        Some(rule.event_type.clone()),
    )
    .await?;
    Ok(rule)
}

/// The caller's notification rules.
pub async fn list_notification_rules(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<notification_rule::Model>> {
    NotificationRule::find()
        .filter(notification_rule::Column::CompanyId.eq(ctx.company_id))
        .order_by_asc(notification_rule::Column::EventType)
        .order_by_asc(notification_rule::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Flips a rule between active and inactive.
pub async fn toggle_notification_rule(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    rule_id: i64,
) -> Result<notification_rule::Model> {
    let rule = NotificationRule::find_by_id(rule_id)
        .filter(notification_rule::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("notification rule", rule_id))?;

    let is_active = !rule.is_active;
    let mut active: notification_rule::ActiveModel = rule.into();
    active.is_active = Set(is_active);
    active.update(db).await.map_err(Into::into)
}

/// Active rules that fire for `event_type`.
pub async fn rules_for_event(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    event_type: &str,
) -> Result<Vec<notification_rule::Model>> {
    NotificationRule::find()
        .filter(notification_rule::Column::CompanyId.eq(ctx.company_id))
        .filter(notification_rule::Column::EventType.eq(event_type))
        .filter(notification_rule::Column::IsActive.eq(true))
        .all(db)
        .await
        .map_err(Into::into)
}
