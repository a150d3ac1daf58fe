//! Communication template entity - reusable message bodies with `{{placeholder}}` markers.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery medium a template is written for
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Email body with subject
    #[sea_orm(string_value = "email")]
    Email,
    /// Short text message
    #[sea_orm(string_value = "sms")]
    Sms,
    /// In-app notification
    #[sea_orm(string_value = "notification")]
    Notification,
}

/// Communication template database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communication_templates")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Template name
    pub name: String,
    /// Grouping, e.g. `"client_update"`, `"safety"`
    pub category: String,
    /// Medium
    pub template_type: TemplateType,
    /// Subject line (email only)
    pub subject: Option<String>,
    /// Body with `{{key}}` markers
    pub body: String,
    /// Hidden from pickers when false
    pub is_active: bool,
}

/// `CommunicationTemplate` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
