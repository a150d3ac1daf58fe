//! Risk prediction entity - a scored assessment returned by the language model.
//!
//! Scores, factors and recommendations are stored exactly as the model
//! returned them once they pass schema validation.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coarse risk band
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// 0-24
    #[sea_orm(string_value = "low")]
    Low,
    /// 25-49
    #[sea_orm(string_value = "medium")]
    Medium,
    /// 50-74
    #[sea_orm(string_value = "high")]
    High,
    /// 75-100
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl RiskLevel {
    /// Maps a 0-100 score onto a band.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Critical
        } else if score >= 50.0 {
            Self::High
        } else if score >= 25.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A contributing risk factor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Short name, e.g. "Budget overrun"
    pub name: String,
    /// Grouping, e.g. "financial", "schedule", "safety"
    pub category: String,
    /// Impact on the overall score, 0-100
    pub impact: f64,
    /// Explanation
    pub description: String,
}

/// A suggested mitigation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskRecommendation {
    /// Action title
    pub title: String,
    /// `"low"`, `"medium"` or `"high"`
    pub priority: String,
    /// Detail
    pub description: String,
}

/// JSON column of factors
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct RiskFactors(pub Vec<RiskFactor>);

/// JSON column of recommendations
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct RiskRecommendations(pub Vec<RiskRecommendation>);

/// Risk prediction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "risk_predictions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project assessed
    pub project_id: i64,
    /// Overall score, 0-100
    pub overall_score: f64,
    /// Band derived from the score
    pub risk_level: RiskLevel,
    /// Narrative summary
    pub summary: String,
    /// Contributing factors
    #[sea_orm(column_type = "Json")]
    pub factors: RiskFactors,
    /// Suggested mitigations
    #[sea_orm(column_type = "Json")]
    pub recommendations: RiskRecommendations,
    /// Model that produced the assessment
    pub model_name: String,
    /// Assessment time
    pub created_at: DateTimeUtc,
}

/// Defines relationships between RiskPrediction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One prediction raises many alerts
    #[sea_orm(has_many = "super::risk_alert::Entity")]
    Alerts,
}

impl Related<super::risk_alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
