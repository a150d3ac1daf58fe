//! Invoice entity - amounts billed to the client for a project.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment state of an invoice
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet sent
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Sent, awaiting payment
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Settled
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Past due date and unpaid
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project being billed
    pub project_id: i64,
    /// Human-facing invoice number
    pub invoice_number: String,
    /// Who is being billed
    pub client_name: String,
    /// Billed amount
    pub amount: f64,
    /// Payment state
    pub status: InvoiceStatus,
    /// Issue date
    pub issue_date: Date,
    /// Payment due date
    pub due_date: Option<Date>,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invoice belongs to one project
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
