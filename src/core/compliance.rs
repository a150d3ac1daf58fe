//! GDPR requests, data retention and compliance reporting.

use crate::{
    core::{audit, tenant::TenantContext, validate},
    entities::{
        AuditLog, CommunicationLog, ComplianceReport, DataRetentionPolicy, GdprRequest, audit_log,
        communication_log,
        compliance_report::{self, ComplianceSummary},
        data_retention_policy,
        gdpr_request::{self, GdprRequestStatus, GdprRequestType},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Resource types a retention policy can purge
pub const RETENTION_RESOURCES: [&str; 2] = ["audit_logs", "communication_logs"];

/// Longest retention a policy may declare, about a century
pub const MAX_RETENTION_DAYS: i32 = 36_500;

/// Whether a GDPR request may move from `from` to `to`.
#[must_use]
pub fn can_transition_gdpr(from: GdprRequestStatus, to: GdprRequestStatus) -> bool {
    use GdprRequestStatus::{Completed, InProgress, Pending, Rejected};
    matches!(
        (from, to),
        (Pending, InProgress) | (Pending, Rejected) | (InProgress, Completed) | (InProgress, Rejected)
    )
}

/// Input for [`create_gdpr_request`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewGdprRequest {
    /// What the data subject asked for
    pub request_type: GdprRequestType,
    /// Data subject
    pub subject_email: String,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Logs a data subject request as pending.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id))]
pub async fn create_gdpr_request(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewGdprRequest,
) -> Result<gdpr_request::Model> {
    let subject_email = validate::require_text("Subject email", &input.subject_email)?;
    if !subject_email.contains('@') {
        return Err(Error::validation(format!("'{subject_email}' is not an email address")));
    }

    let request = gdpr_request::ActiveModel {
        company_id: Set(ctx.company_id),
        request_type: Set(input.request_type),
        subject_email: Set(subject_email),
        status: Set(GdprRequestStatus::Pending),
        notes: Set(input.notes),
        requested_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "gdpr_request.create",
        "gdpr_request",
        Some(request.id.to_string()),
        Some(request.request_type.to_value()),
    )
    .await?;
    Ok(request)
}

/// The caller's GDPR requests, newest first.
pub async fn list_gdpr_requests(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    status: Option<GdprRequestStatus>,
) -> Result<Vec<gdpr_request::Model>> {
    let mut query = GdprRequest::find().filter(gdpr_request::Column::CompanyId.eq(ctx.company_id));
    if let Some(status) = status {
        query = query.filter(gdpr_request::Column::Status.eq(status));
    }
    query
        .order_by_desc(gdpr_request::Column::RequestedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves a GDPR request along, stamping `completed_at` on completion.
pub async fn transition_gdpr_request(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    request_id: i64,
    to: GdprRequestStatus,
    notes: Option<String>,
) -> Result<gdpr_request::Model> {
    let request = GdprRequest::find_by_id(request_id)
        .filter(gdpr_request::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("gdpr request", request_id))?;

    let from = request.status;
    if !can_transition_gdpr(from, to) {
        return Err(Error::InvalidTransition {
            entity: "gdpr request",
            from: from.to_value(),
            to: to.to_value(),
        });
    }

    let mut active: gdpr_request::ActiveModel = request.into();
    active.status = Set(to);
    if to == GdprRequestStatus::Completed {
        active.completed_at = Set(Some(Utc::now()));
    }
    if notes.is_some() {
        active.notes = Set(notes);
    }
    let updated = active.update(db).await?;

    audit::record(
        db,
        ctx,
        "gdpr_request.status",
        "gdpr_request",
        Some(request_id.to_string()),
        Some(format!("{} -> {}", from.to_value(), to.to_value())),
    )
    .await?;
    Ok(updated)
}

/// Input for [`create_retention_policy`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewRetentionPolicy {
    /// One of [`RETENTION_RESOURCES`]
    pub resource_type: String,
    /// Age in days after which rows are purged
    pub retention_days: i32,
}

/// Creates an active retention policy.
pub async fn create_retention_policy(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewRetentionPolicy,
) -> Result<data_retention_policy::Model> {
    let resource_type = input.resource_type.trim().to_string();
    if !RETENTION_RESOURCES.contains(&resource_type.as_str()) {
        return Err(Error::validation(format!(
            "Unsupported retention resource '{resource_type}', expected one of {}",
            RETENTION_RESOURCES.join(", ")
        )));
    }
    if !(1..=MAX_RETENTION_DAYS).contains(&input.retention_days) {
        return Err(Error::validation(format!(
            "Retention must be between 1 and {MAX_RETENTION_DAYS} days, got {}",
            input.retention_days
        )));
    }

    let policy = data_retention_policy::ActiveModel {
        company_id: Set(ctx.company_id),
        resource_type: Set(resource_type),
        retention_days: Set(input.retention_days),
        is_active: Set(true),
        last_applied_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "retention_policy.create",
        "data_retention_policy",
        Some(policy.id.to_string()),
        Some(format!("{} {}d", policy.resource_type, policy.retention_days)),
    )
    .await?;
    Ok(policy)
}

/// The caller's retention policies.
pub async fn list_retention_policies(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<data_retention_policy::Model>> {
    DataRetentionPolicy::find()
        .filter(data_retention_policy::Column::CompanyId.eq(ctx.company_id))
        .order_by_asc(data_retention_policy::Column::ResourceType)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Enables or disables a retention policy.
pub async fn set_retention_policy_active(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    policy_id: i64,
    is_active: bool,
) -> Result<data_retention_policy::Model> {
    let policy = DataRetentionPolicy::find_by_id(policy_id)
        .filter(data_retention_policy::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("retention policy", policy_id))?;

    let mut active: data_retention_policy::ActiveModel = policy.into();
    active.is_active = Set(is_active);
    active.update(db).await.map_err(Into::into)
}

/// Rows purged by one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionRun {
    /// Policy applied
    pub policy_id: i64,
    /// Table purged
    pub resource_type: String,
    /// Rows older than this were deleted
    pub cutoff: DateTime<Utc>,
    /// Rows deleted
    pub deleted: u64,
}

/// Applies every active policy of the caller's company now.
pub async fn apply_retention_policies(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<RetentionRun>> {
    apply_retention_policies_at(db, ctx, Utc::now()).await
}

/// Instant before which rows fall out of a `retention_days` window.
fn retention_cutoff(now: DateTime<Utc>, retention_days: i32) -> Result<DateTime<Utc>> {
    Duration::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            Error::validation(format!("Retention of {retention_days} days is out of range"))
        })
}

/// [`apply_retention_policies`] with an explicit clock.
#[tracing::instrument(skip(db, ctx), fields(company_id = ctx.company_id))]
pub async fn apply_retention_policies_at(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    now: DateTime<Utc>,
) -> Result<Vec<RetentionRun>> {
    let policies = DataRetentionPolicy::find()
        .filter(data_retention_policy::Column::CompanyId.eq(ctx.company_id))
        .filter(data_retention_policy::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let mut runs = Vec::with_capacity(policies.len());
    for policy in policies {
        let cutoff = retention_cutoff(now, policy.retention_days)?;
        let deleted = match policy.resource_type.as_str() {
            "audit_logs" => {
                AuditLog::delete_many()
                    .filter(audit_log::Column::CompanyId.eq(ctx.company_id))
                    .filter(audit_log::Column::CreatedAt.lt(cutoff))
                    .exec(db)
                    .await?
                    .rows_affected
            }
            "communication_logs" => {
                CommunicationLog::delete_many()
                    .filter(communication_log::Column::CompanyId.eq(ctx.company_id))
                    .filter(communication_log::Column::CreatedAt.lt(cutoff))
                    .exec(db)
                    .await?
                    .rows_affected
            }
            other => {
                tracing::warn!(policy_id = policy.id, resource_type = other, "Skipping unknown retention resource");
                continue;
            }
        };

        let run = RetentionRun {
            policy_id: policy.id,
            resource_type: policy.resource_type.clone(),
            cutoff,
            deleted,
        };
        let mut active: data_retention_policy::ActiveModel = policy.into();
        active.last_applied_at = Set(Some(now));
        active.update(db).await?;

        tracing::info!(policy_id = run.policy_id, deleted, "Retention policy applied");
        runs.push(run);
    }

    let total: u64 = runs.iter().map(|r| r.deleted).sum();
    audit::record(
        db,
        ctx,
        "retention.apply",
        "data_retention_policy",
        None,
        Some(format!("{} policies, {total} rows", runs.len())),
    )
    .await?;
    Ok(runs)
}

/// Builds report figures from raw period data.
#[must_use]
pub fn summarize_compliance(
    audit_actions: &[String],
    gdpr_statuses: &[GdprRequestStatus],
    active_retention_policies: u64,
) -> ComplianceSummary {
    let mut summary = ComplianceSummary {
        active_retention_policies,
        ..Default::default()
    };
    for action in audit_actions {
        *summary.audit_events_by_action.entry(action.clone()).or_insert(0) += 1;
        summary.total_audit_events += 1;
    }
    for status in gdpr_statuses {
        *summary.gdpr_requests_by_status.entry(status.to_value()).or_insert(0) += 1;
    }
    summary
}

/// Input for [`generate_compliance_report`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewComplianceReport {
    /// Report kind
    pub report_type: String,
    /// First day covered
    pub period_start: NaiveDate,
    /// Last day covered (inclusive)
    pub period_end: NaiveDate,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Captures audit and GDPR activity for a period.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id))]
pub async fn generate_compliance_report(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewComplianceReport,
) -> Result<compliance_report::Model> {
    let report_type = validate::require_text("Report type", &input.report_type)?;
    if input.period_end < input.period_start {
        return Err(Error::validation("Report period ends before it starts"));
    }
    let from = day_start(input.period_start);
    let until = day_start(input.period_end) + Duration::days(1);

    let actions: Vec<String> = AuditLog::find()
        .select_only()
        .column(audit_log::Column::Action)
        .filter(audit_log::Column::CompanyId.eq(ctx.company_id))
        .filter(audit_log::Column::CreatedAt.gte(from))
        .filter(audit_log::Column::CreatedAt.lt(until))
        .into_tuple()
        .all(db)
        .await?;

    let statuses: Vec<GdprRequestStatus> = GdprRequest::find()
        .select_only()
        .column(gdpr_request::Column::Status)
        .filter(gdpr_request::Column::CompanyId.eq(ctx.company_id))
        .filter(gdpr_request::Column::RequestedAt.gte(from))
        .filter(gdpr_request::Column::RequestedAt.lt(until))
        .into_tuple()
        .all(db)
        .await?;

    let active_policies = DataRetentionPolicy::find()
        .filter(data_retention_policy::Column::CompanyId.eq(ctx.company_id))
        .filter(data_retention_policy::Column::IsActive.eq(true))
        .count(db)
        .await?;

    let report = compliance_report::ActiveModel {
        company_id: Set(ctx.company_id),
        report_type: Set(report_type),
        period_start: Set(input.period_start),
        period_end: Set(input.period_end),
        summary: Set(summarize_compliance(&actions, &statuses, active_policies)),
        generated_by: Set(ctx.user_id.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "compliance_report.generate",
        "compliance_report",
        Some(report.id.to_string()),
        None,
    )
    .await?;
    Ok(report)
}

/// The caller's compliance reports, newest first.
pub async fn list_compliance_reports(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<compliance_report::Model>> {
    ComplianceReport::find()
        .filter(compliance_report::Column::CompanyId.eq(ctx.company_id))
        .order_by_desc(compliance_report::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use GdprRequestStatus::{Completed, InProgress, Pending, Rejected};

    #[test]
    fn test_gdpr_transition_table() {
        assert!(can_transition_gdpr(Pending, InProgress));
        assert!(can_transition_gdpr(Pending, Rejected));
        assert!(can_transition_gdpr(InProgress, Completed));
        assert!(can_transition_gdpr(InProgress, Rejected));
        assert!(!can_transition_gdpr(Pending, Completed));
        assert!(!can_transition_gdpr(Completed, Pending));
        assert!(!can_transition_gdpr(Rejected, InProgress));
    }

    #[test]
    fn test_summarize_compliance() {
        let actions = vec![
            "project.create".to_string(),
            "project.create".to_string(),
            "api_key.revoke".to_string(),
        ];
        let summary = summarize_compliance(&actions, &[Pending, Completed, Pending], 2);
        assert_eq!(summary.total_audit_events, 3);
        assert_eq!(summary.audit_events_by_action["project.create"], 2);
        assert_eq!(summary.gdpr_requests_by_status["pending"], 2);
        assert_eq!(summary.active_retention_policies, 2);
    }

    #[tokio::test]
    async fn test_gdpr_lifecycle() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "dpo");

        let request = create_gdpr_request(
            &db,
            &ctx,
            NewGdprRequest {
                request_type: GdprRequestType::Erasure,
                subject_email: "former.worker@example.com".to_string(),
                notes: None,
            },
        )
        .await?;
        assert_eq!(request.status, Pending);

        let skipped = transition_gdpr_request(&db, &ctx, request.id, Completed, None).await;
        assert!(matches!(skipped, Err(Error::InvalidTransition { .. })));

        transition_gdpr_request(&db, &ctx, request.id, InProgress, None).await?;
        let done =
            transition_gdpr_request(&db, &ctx, request.id, Completed, Some("Erased".to_string()))
                .await?;
        assert!(done.completed_at.is_some());
        assert_eq!(done.notes.as_deref(), Some("Erased"));

        assert_eq!(list_gdpr_requests(&db, &ctx, Some(Completed)).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_retention_purges_only_old_rows() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "dpo");

        let policy = create_retention_policy(
            &db,
            &ctx,
            NewRetentionPolicy {
                resource_type: "audit_logs".to_string(),
                retention_days: 30,
            },
        )
        .await?;
        assert!(
            create_retention_policy(
                &db,
                &ctx,
                NewRetentionPolicy {
                    resource_type: "projects".to_string(),
                    retention_days: 30,
                },
            )
            .await
            .is_err()
        );

        // Run as if 31 days have passed: the policy-creation audit row is now stale
        let later = Utc::now() + Duration::days(31);
        let runs = apply_retention_policies_at(&db, &ctx, later).await?;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].policy_id, policy.id);
        assert_eq!(runs[0].deleted, 1);

        let policies = list_retention_policies(&db, &ctx).await?;
        assert!(policies[0].last_applied_at.is_some());

        set_retention_policy_active(&db, &ctx, policy.id, false).await?;
        assert!(apply_retention_policies_at(&db, &ctx, later).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_retention_days_are_bounded() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "dpo");

        let too_long = create_retention_policy(
            &db,
            &ctx,
            NewRetentionPolicy {
                resource_type: "audit_logs".to_string(),
                retention_days: 200_000_000,
            },
        )
        .await;
        assert!(matches!(too_long, Err(Error::Validation { .. })));

        let longest = create_retention_policy(
            &db,
            &ctx,
            NewRetentionPolicy {
                resource_type: "audit_logs".to_string(),
                retention_days: MAX_RETENTION_DAYS,
            },
        )
        .await?;
        assert_eq!(longest.retention_days, MAX_RETENTION_DAYS);
        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_range_stored_policy_fails_without_panicking() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "dpo");

        // Rows written before the bound existed
        data_retention_policy::ActiveModel {
            company_id: Set(ctx.company_id),
            resource_type: Set("audit_logs".to_string()),
            retention_days: Set(200_000_000),
            is_active: Set(true),
            last_applied_at: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let result = apply_retention_policies(&db, &ctx).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now, 30).unwrap(), now - Duration::days(30));
        assert!(retention_cutoff(now, i32::MAX).is_err());
    }

    #[tokio::test]
    async fn test_generate_report() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "dpo");
        create_gdpr_request(
            &db,
            &ctx,
            NewGdprRequest {
                request_type: GdprRequestType::Access,
                subject_email: "client@example.com".to_string(),
                notes: None,
            },
        )
        .await?;

        let today = Utc::now().date_naive();
        let report = generate_compliance_report(
            &db,
            &ctx,
            NewComplianceReport {
                report_type: "monthly".to_string(),
                period_start: today - Duration::days(1),
                period_end: today,
            },
        )
        .await?;
        assert_eq!(report.summary.audit_events_by_action["gdpr_request.create"], 1);
        assert_eq!(report.summary.gdpr_requests_by_status["pending"], 1);
        assert_eq!(list_compliance_reports(&db, &ctx).await?.len(), 1);
        Ok(())
    }
}
