//! Data retention policy entity - how long rows of a resource type are kept.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Data retention policy database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data_retention_policies")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Table the policy governs, e.g. `"audit_logs"`
    pub resource_type: String,
    /// Rows older than this many days are purged
    pub retention_days: i32,
    /// Inactive policies are skipped
    pub is_active: bool,
    /// Last time the policy was applied
    pub last_applied_at: Option<DateTimeUtc>,
}

/// `DataRetentionPolicy` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
