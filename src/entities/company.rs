//! Company entity - the tenant boundary.
//!
//! Nearly every other table carries a `company_id` pointing here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Company database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    /// Unique identifier, also the tenant id
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name used in generated content
    #[sea_orm(unique)]
    pub name: String,
    /// Trade or market segment (e.g. "commercial", "residential")
    pub industry: Option<String>,
    /// When the tenant was provisioned
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Company and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One company owns many projects
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
