//! GDPR request entity - a data-subject request and its handling status.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of data-subject request
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GdprRequestType {
    /// Copy of held data
    #[sea_orm(string_value = "access")]
    Access,
    /// Right to be forgotten
    #[sea_orm(string_value = "erasure")]
    Erasure,
    /// Correction of held data
    #[sea_orm(string_value = "rectification")]
    Rectification,
    /// Machine-readable export
    #[sea_orm(string_value = "portability")]
    Portability,
}

/// Handling status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GdprRequestStatus {
    /// Received
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Being worked on
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Fulfilled
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Declined
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// GDPR request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gdpr_requests")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Request kind
    pub request_type: GdprRequestType,
    /// Data subject's email address
    pub subject_email: String,
    /// Handling status
    pub status: GdprRequestStatus,
    /// Handler notes
    pub notes: Option<String>,
    /// When the request was received
    pub requested_at: DateTimeUtc,
    /// When it reached `completed`
    pub completed_at: Option<DateTimeUtc>,
}

/// `GdprRequest` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
