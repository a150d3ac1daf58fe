//! Geofence entity - a named circle around a job site.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Geofence database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "geofences")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub company_id: i64,
    /// Site this fence surrounds
    pub project_id: i64,
    /// Label shown to field crews
    pub name: String,
    /// Centre latitude in decimal degrees
    pub center_latitude: f64,
    /// Centre longitude in decimal degrees
    pub center_longitude: f64,
    /// Radius in metres
    pub radius_meters: f64,
    /// Inactive fences are ignored when verifying reports
    pub is_active: bool,
}

/// `Geofence` relationships are resolved through `project_id` lookups
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
