//! AI model configuration entity - the catalogue of LLMs the platform may call.
//!
//! Rows are global (not tenant-scoped). A row with `is_alias` set is a
//! pointer: `points_to_model` names the concrete model it resolves to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AI model configuration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_model_configurations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Vendor family, e.g. `"openai"`, `"anthropic"`
    pub provider: String,
    /// Model name as sent to the provider, or the alias name
    #[sea_orm(unique)]
    pub model_name: String,
    /// Name shown in admin screens
    pub display_name: String,
    /// Whether this row is an alias for another model
    pub is_alias: bool,
    /// Target model name when `is_alias` is set
    pub points_to_model: Option<String>,
    /// Output quality, 1-5
    pub quality_rating: i32,
    /// Latency rating, 1-5
    pub speed_rating: i32,
    /// Cost rating, 1-5 (5 = cheapest)
    pub cost_rating: i32,
    /// Lower values are tried first
    pub priority_order: i32,
    /// Inactive rows are hidden from selection
    pub is_active: bool,
    /// Default model for its provider; at most one per provider
    pub is_default: bool,
}

/// `AiModelConfiguration` has no relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
