//! Journal entry entity - header row of a balanced double-entry posting.
//!
//! The lines live in `journal_lines`; totals are denormalised here at posting time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Journal entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Accounting date
    pub entry_date: Date,
    /// Narrative
    pub description: String,
    /// External reference (invoice number, cheque number...)
    pub reference: Option<String>,
    /// Sum of all line debits
    pub total_debit: f64,
    /// Sum of all line credits
    pub total_credit: f64,
    /// User who posted the entry
    pub created_by: String,
    /// When the entry was posted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between JournalEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One entry has many lines
    #[sea_orm(has_many = "super::journal_line::Entity")]
    Lines,
}

impl Related<super::journal_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
