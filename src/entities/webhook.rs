//! Webhook entity - a tenant-registered HTTP endpoint for outbound events.
use super::types::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Webhook database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhooks")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Label
    pub name: String,
    /// Destination URL (http or https)
    pub url: String,
    /// Event names this endpoint subscribes to
    #[sea_orm(column_type = "Json")]
    pub events: StringList,
    /// Disabled endpoints receive nothing
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
}

/// `Webhook` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
