//! Audit log entity - append-only record of who changed what.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Actor
    pub user_id: String,
    /// Stable action name, e.g. `"journal_entry.create"`
    pub action: String,
    /// Kind of resource touched
    pub resource_type: String,
    /// Identifier of the resource, when there is one
    pub resource_id: Option<String>,
    /// Free-form detail
    pub details: Option<String>,
    /// Event time
    pub created_at: DateTimeUtc,
}

/// `AuditLog` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
