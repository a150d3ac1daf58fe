//! Quality inspection entity.
//!
//! Checklist items and deficiencies are embedded JSON documents, but they are
//! typed: every item carries an explicit status enum that is validated when
//! the row is read or written.

use super::types::StringList;
use chrono::NaiveDate;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inspection lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    /// Booked, not started
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Inspector on site
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Passed
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Did not pass, or the visit was abandoned
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Result recorded against a checklist item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    /// Not yet evaluated
    #[default]
    Pending,
    /// Meets the requirement
    Pass,
    /// Does not meet the requirement
    Fail,
    /// Does not apply to this site
    NotApplicable,
}

/// One line of an inspection checklist
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Stable id within the inspection
    pub id: String,
    /// What to check
    pub text: String,
    /// Outcome
    #[serde(default)]
    pub status: ChecklistStatus,
    /// Evidence photo URLs
    #[serde(default)]
    pub photos: Vec<String>,
    /// Who must act on it
    #[serde(default)]
    pub assignee: Option<String>,
    /// When it must be addressed
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Severity of a deficiency
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencySeverity {
    /// Cosmetic
    Low,
    /// Needs fixing before handover
    Medium,
    /// Needs fixing before further work
    High,
    /// Safety issue, blocks completion
    Critical,
}

/// Whether a deficiency still needs work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencyStatus {
    /// Outstanding
    #[default]
    Open,
    /// Fixed and verified
    Resolved,
}

/// A defect found during an inspection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deficiency {
    /// Stable id within the inspection
    pub id: String,
    /// What is wrong
    pub description: String,
    /// How bad it is
    pub severity: DeficiencySeverity,
    /// Open or resolved
    #[serde(default)]
    pub status: DeficiencyStatus,
    /// Who must fix it
    #[serde(default)]
    pub assignee: Option<String>,
    /// Fix-by date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// When it was marked resolved
    #[serde(default)]
    pub resolved_at: Option<DateTimeUtc>,
}

/// JSON column holding the checklist
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ChecklistItems(pub Vec<ChecklistItem>);

/// JSON column holding the deficiencies
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Deficiencies(pub Vec<Deficiency>);

/// Quality inspection database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quality_inspections")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project inspected
    pub project_id: i64,
    /// Short title, e.g. "Level 2 slab pre-pour"
    pub title: String,
    /// Inspector name
    pub inspector: String,
    /// Lifecycle status
    pub status: InspectionStatus,
    /// Planned visit date
    pub scheduled_date: Date,
    /// Set when the inspection reaches `completed` or `failed`
    pub completed_at: Option<DateTimeUtc>,
    /// Checklist items
    #[sea_orm(column_type = "Json")]
    pub checklist_items: ChecklistItems,
    /// Deficiencies found
    #[sea_orm(column_type = "Json")]
    pub deficiencies: Deficiencies,
    /// General photo URLs
    #[sea_orm(column_type = "Json")]
    pub photos: StringList,
    /// Inspector notes
    pub notes: Option<String>,
}

/// `QualityInspection` relationships are resolved through `project_id` lookups
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
