//! Job cost entity - labour, material and subcontract costs booked to a project.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Job cost database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job_costs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project the cost is booked against
    pub project_id: i64,
    /// Cost code category, e.g. `"labor"`, `"materials"`
    pub category: String,
    /// What was paid for
    pub description: String,
    /// Amount, never negative
    pub amount: f64,
    /// Date the cost was incurred
    pub cost_date: Date,
}

/// Defines relationships between JobCost and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each job cost belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
