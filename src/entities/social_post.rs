//! Social post entity - generated marketing copy for one platform.
use super::types::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where the copy came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    /// Produced by the language model
    #[sea_orm(string_value = "ai")]
    Ai,
    /// Fallback template text
    #[sea_orm(string_value = "template")]
    Template,
}

/// Social post database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "social_posts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Target platform, e.g. `"linkedin"`
    pub platform: String,
    /// Post body
    pub content: String,
    /// Hashtags without the leading `#`
    #[sea_orm(column_type = "Json")]
    pub hashtags: StringList,
    /// Publishing state; generated posts start as `"draft"`
    pub status: String,
    /// What triggered generation, e.g. `"manual"`, `"project_milestone"`
    pub trigger_type: String,
    /// Template category used for the prompt
    pub template_category: String,
    /// AI or template fallback
    pub generated_by: GeneratedBy,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
}

/// `SocialPost` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
