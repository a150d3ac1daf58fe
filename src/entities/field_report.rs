//! Field report entity - a located site note whose position was verified against geofences.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Field report database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field_reports")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Project reported on
    pub project_id: i64,
    /// Nearest active geofence at submission time
    pub geofence_id: Option<i64>,
    /// User who filed the report
    pub reported_by: String,
    /// Reported latitude
    pub latitude: f64,
    /// Reported longitude
    pub longitude: f64,
    /// Report body
    pub notes: String,
    /// Distance to the nearest fence centre, if any fence exists
    pub distance_meters: Option<f64>,
    /// Whether the position fell inside any active fence
    pub inside_geofence: bool,
    /// Submission timestamp
    pub created_at: DateTimeUtc,
}

/// `FieldReport` has no declared relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
