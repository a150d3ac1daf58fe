//! Risk alert entity - raised for each high-impact factor of a prediction.
use super::risk_prediction::RiskLevel;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Risk alert database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "risk_alerts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Prediction that raised the alert
    pub prediction_id: i64,
    /// Project concerned
    pub project_id: i64,
    /// `high` or `critical`
    pub severity: RiskLevel,
    /// Alert text
    pub message: String,
    /// Set once someone has seen it
    pub acknowledged: bool,
    /// When the alert was raised
    pub created_at: DateTimeUtc,
}

/// Defines relationships between RiskAlert and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each alert belongs to one prediction
    #[sea_orm(
        belongs_to = "super::risk_prediction::Entity",
        from = "Column::PredictionId",
        to = "super::risk_prediction::Column::Id"
    )]
    Prediction,
}

impl Related<super::risk_prediction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prediction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
