//! Social post queue entity - a request to generate posts, processed synchronously.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Processing state of a queue row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting to be processed
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Picked up by a generation request
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Posts were created
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Generation failed; see `error`
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Social post queue database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "social_post_queue")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Processing state
    pub status: QueueStatus,
    /// What enqueued the request
    pub trigger_type: String,
    /// Number of posts created when processed
    pub posts_created: i32,
    /// Failure detail
    pub error: Option<String>,
    /// Enqueue time
    pub created_at: DateTimeUtc,
    /// Processing completion time
    pub processed_at: Option<DateTimeUtc>,
}

/// `SocialPostQueue` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
