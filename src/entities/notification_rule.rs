//! Notification rule entity - routes a domain event to a channel and recipients.
use super::types::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_rules")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Rule name
    pub name: String,
    /// Event that fires the rule, e.g. `"inspection.failed"`
    pub event_type: String,
    /// Channel, e.g. `"email"`, `"sms"`
    pub channel: String,
    /// Addresses or user ids
    #[sea_orm(column_type = "Json")]
    pub recipients: StringList,
    /// Inactive rules never match
    pub is_active: bool,
}

/// `NotificationRule` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
