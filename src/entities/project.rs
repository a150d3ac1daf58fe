//! Project entity - a construction job owned by a company.
//!
//! Costs, invoices, expenses, inspections, geofences and risk predictions
//! all hang off a project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a project
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Pre-construction
    #[sea_orm(string_value = "planning")]
    Planning,
    /// Work under way
    #[sea_orm(string_value = "active")]
    Active,
    /// Paused
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    /// Handed over
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Abandoned
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Project database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Unique identifier for the project
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Approved budget in the company's currency
    pub budget: f64,
    /// Current lifecycle status
    pub status: ProjectStatus,
    /// Progress reported by the site team, 0-100
    pub completion_percentage: f64,
    /// Planned start
    pub start_date: Option<Date>,
    /// Planned end
    pub end_date: Option<Date>,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Project and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each project belongs to one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
    /// One project has many job costs
    #[sea_orm(has_many = "super::job_cost::Entity")]
    JobCosts,
    /// One project has many invoices
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoices,
    /// One project has many expenses
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::job_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobCosts.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
