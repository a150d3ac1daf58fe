//! Compliance report entity - a stored snapshot of compliance metrics for a period.
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Figures captured by a report
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ComplianceSummary {
    /// Audit events in the period, keyed by action
    pub audit_events_by_action: BTreeMap<String, u64>,
    /// Total audit events in the period
    pub total_audit_events: u64,
    /// GDPR requests received in the period, keyed by status
    pub gdpr_requests_by_status: BTreeMap<String, u64>,
    /// Retention policies active when the report was generated
    pub active_retention_policies: u64,
}

/// Compliance report database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compliance_reports")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Report kind, e.g. `"monthly"`
    pub report_type: String,
    /// First day covered
    pub period_start: Date,
    /// Last day covered
    pub period_end: Date,
    /// Captured figures
    #[sea_orm(column_type = "Json")]
    pub summary: ComplianceSummary,
    /// User who generated it
    pub generated_by: String,
    /// Generation time
    pub created_at: DateTimeUtc,
}

/// `ComplianceReport` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
