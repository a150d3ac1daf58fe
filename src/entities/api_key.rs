//! API key entity - programmatic access credentials for a tenant.
//!
//! Only the SHA-256 hash of the key is stored; the plaintext is shown once
//! at creation time.

use super::types::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API key database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Label chosen by the admin
    pub name: String,
    /// First characters of the key, for recognising it in lists
    pub key_prefix: String,
    /// Hex SHA-256 of the full key
    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub key_hash: String,
    /// Granted permissions, e.g. `"projects:read"`
    #[sea_orm(column_type = "Json")]
    pub permissions: StringList,
    /// Requests allowed per rolling hour
    pub rate_limit: i32,
    /// Lifetime request count
    pub usage_count: i64,
    /// Start of the current rate-limit window
    pub window_started_at: Option<DateTimeUtc>,
    /// Requests made in the current window
    pub window_count: i32,
    /// Key stops working after this instant
    pub expires_at: Option<DateTimeUtc>,
    /// Last successful authentication
    pub last_used_at: Option<DateTimeUtc>,
    /// Cleared when the key is revoked
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
}

/// `ApiKey` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
