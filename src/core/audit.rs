//! Audit logging and CSV export.
//!
//! Mutating operations across the core call [`record`]; compliance screens
//! read the log back through [`list_audit_logs`] and download it with
//! [`export_csv`].

use crate::{
    core::tenant::TenantContext,
    entities::{AuditLog, audit_log},
    errors::Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::Deserialize;

/// Column order of the CSV download
pub const CSV_HEADER: [&str; 7] = [
    "id",
    "created_at",
    "user_id",
    "action",
    "resource_type",
    "resource_id",
    "details",
];

const DEFAULT_PAGE_SIZE: u64 = 100;
const MAX_PAGE_SIZE: u64 = 1000;

/// Filters accepted by [`list_audit_logs`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    /// Exact action name
    pub action: Option<String>,
    /// Exact resource type
    pub resource_type: Option<String>,
    /// Exact actor
    pub user_id: Option<String>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
    /// Page size (default 100, max 1000)
    pub limit: Option<u64>,
    /// Rows to skip
    pub offset: Option<u64>,
}

/// Appends an audit record attributed to the caller.
pub async fn record<C>(
    db: &C,
    ctx: &TenantContext,
    action: &str,
    resource_type: &str,
    resource_id: Option<String>,
    details: Option<String>,
) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    let entry = audit_log::ActiveModel {
        company_id: Set(ctx.company_id),
        user_id: Set(ctx.user_id.clone()),
        action: Set(action.to_string()),
        resource_type: Set(resource_type.to_string()),
        resource_id: Set(resource_id),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = entry.insert(db).await?;
    tracing::debug!(
        company_id = ctx.company_id,
        action,
        resource_type,
        "Audit event recorded"
    );
    Ok(result)
}

/// Lists the tenant's audit events, newest first.
pub async fn list_audit_logs(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    filter: &AuditLogFilter,
) -> Result<Vec<audit_log::Model>> {
    let mut query = AuditLog::find().filter(audit_log::Column::CompanyId.eq(ctx.company_id));

    if let Some(action) = &filter.action {
        query = query.filter(audit_log::Column::Action.eq(action.as_str()));
    }
    if let Some(resource_type) = &filter.resource_type {
        query = query.filter(audit_log::Column::ResourceType.eq(resource_type.as_str()));
    }
    if let Some(user_id) = &filter.user_id {
        query = query.filter(audit_log::Column::UserId.eq(user_id.as_str()));
    }
    if let Some(since) = filter.since {
        query = query.filter(audit_log::Column::CreatedAt.gte(since));
    }
    if let Some(until) = filter.until {
        query = query.filter(audit_log::Column::CreatedAt.lt(until));
    }

    query
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .limit(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
        .offset(filter.offset.unwrap_or(0))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renders audit events as CSV.
///
/// Fields containing commas, quotes or newlines are quoted, and the output
/// depends only on `logs`, so exporting the same slice twice yields
/// byte-identical files.
pub fn export_csv(logs: &[audit_log::Model]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for log in logs {
        writer.write_record([
            log.id.to_string(),
            log.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            log.user_id.clone(),
            log.action.clone(),
            log.resource_type.clone(),
            log.resource_id.clone().unwrap_or_default(),
            log.details.clone().unwrap_or_default(),
        ])?;
    }

    Ok(writer.into_inner()?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn sample_log(id: i64, details: Option<&str>) -> audit_log::Model {
        audit_log::Model {
            id,
            company_id: 1,
            user_id: "alice".to_string(),
            action: "project.create".to_string(),
            resource_type: "project".to_string(),
            resource_id: Some(id.to_string()),
            details: details.map(ToString::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_export_csv_is_idempotent() {
        let logs = vec![sample_log(1, None), sample_log(2, Some("budget 1000"))];
        let first = export_csv(&logs).unwrap();
        let second = export_csv(&logs).unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,created_at,user_id,action,resource_type,resource_id,details"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,2024-03-01T09:30:00Z,alice,project.create,project,1,"
        );
    }

    #[test]
    fn test_export_csv_escapes_commas_and_quotes() {
        let logs = vec![sample_log(5, Some("renamed \"Tower A\", phase 2"))];
        let bytes = export_csv(&logs).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), CSV_HEADER.len());
        assert_eq!(&records[0][6], "renamed \"Tower A\", phase 2");
    }

    #[test]
    fn test_export_csv_empty_has_header_only() {
        let text = String::from_utf8(export_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_record_and_filter_integration() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "alice");
        let other = TenantContext::user(company.id + 100, "mallory");

        record(&db, &ctx, "project.create", "project", Some("1".into()), None).await?;
        record(&db, &ctx, "gdpr_request.update", "gdpr_request", None, None).await?;
        record(&db, &other, "project.create", "project", None, None).await?;

        let all = list_audit_logs(&db, &ctx, &AuditLogFilter::default()).await?;
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|log| log.company_id == company.id));
        // Newest first
        assert_eq!(all[0].action, "gdpr_request.update");

        let filtered = list_audit_logs(
            &db,
            &ctx,
            &AuditLogFilter {
                action: Some("project.create".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_id, "alice");

        Ok(())
    }
}
