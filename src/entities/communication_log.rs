//! Communication log entity - CRM record of a call, email or message with a contact.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which way the message travelled
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the contact
    #[sea_orm(string_value = "inbound")]
    Inbound,
    /// Sent to the contact
    #[sea_orm(string_value = "outbound")]
    Outbound,
}

/// Communication log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communication_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Related project, if any
    pub project_id: Option<i64>,
    /// Who we talked to
    pub contact_name: String,
    /// Medium, e.g. `"email"`, `"phone"`
    pub channel: String,
    /// Inbound or outbound
    pub direction: Direction,
    /// Subject line
    pub subject: Option<String>,
    /// Content or call notes
    pub body: String,
    /// User who logged it
    pub logged_by: String,
    /// When it was logged
    pub created_at: DateTimeUtc,
}

/// `CommunicationLog` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
