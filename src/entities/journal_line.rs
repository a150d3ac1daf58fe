//! Journal line entity - one debit or credit against an account.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Journal line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_lines")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent entry
    pub entry_id: i64,
    /// Position within the entry, starting at 1
    pub line_number: i32,
    /// Chart-of-accounts code
    pub account_code: String,
    /// Optional line memo
    pub memo: Option<String>,
    /// Debit amount (zero when this is a credit line)
    pub debit: f64,
    /// Credit amount (zero when this is a debit line)
    pub credit: f64,
}

/// Defines relationships between JournalLine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one entry
    #[sea_orm(
        belongs_to = "super::journal_entry::Entity",
        from = "Column::EntryId",
        to = "super::journal_entry::Column::Id"
    )]
    Entry,
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
