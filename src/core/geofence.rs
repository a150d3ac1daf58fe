//! Geofences and location-verified field reports.

use crate::{
    core::{audit, project, tenant::TenantContext, validate},
    entities::{FieldReport, Geofence, field_report, geofence},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting coordinates outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::validation(format!("Latitude {latitude} out of range")));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::validation(format!("Longitude {longitude} out of range")));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points in metres.
#[must_use]
pub fn haversine_distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Outcome of checking a point against one fence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceCheck {
    /// Distance from the fence centre
    pub distance_meters: f64,
    /// Fence radius
    pub radius_meters: f64,
    /// `distance <= radius`
    pub inside: bool,
    /// 100 at the centre, falling linearly to 0 at the boundary
    pub proximity_percent: f64,
}

impl GeofenceCheck {
    /// Classifies a known distance against a radius.
    #[must_use]
    pub fn from_distance(distance_meters: f64, radius_meters: f64) -> Self {
        let inside = distance_meters <= radius_meters;
        let proximity_percent = if radius_meters <= 0.0 {
            if inside { 100.0 } else { 0.0 }
        } else {
            ((1.0 - distance_meters / radius_meters) * 100.0).clamp(0.0, 100.0)
        };

        Self {
            distance_meters,
            radius_meters,
            inside,
            proximity_percent,
        }
    }
}

/// Checks `point` against a stored fence.
#[must_use]
pub fn check_location(fence: &geofence::Model, point: GeoPoint) -> GeofenceCheck {
    let centre = GeoPoint {
        latitude: fence.center_latitude,
        longitude: fence.center_longitude,
    };
    GeofenceCheck::from_distance(haversine_distance_meters(centre, point), fence.radius_meters)
}

/// Input for [`create_geofence`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewGeofence {
    /// Label
    pub name: String,
    /// Centre latitude
    pub center_latitude: f64,
    /// Centre longitude
    pub center_longitude: f64,
    /// Radius in metres
    pub radius_meters: f64,
}

/// Creates an active fence around one of the caller's projects.
pub async fn create_geofence(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewGeofence,
) -> Result<geofence::Model> {
    let name = validate::require_text("Geofence name", &input.name)?;
    let centre = GeoPoint::new(input.center_latitude, input.center_longitude)?;
    if !input.radius_meters.is_finite() || input.radius_meters <= 0.0 {
        return Err(Error::validation("Geofence radius must be positive"));
    }
    project::get_project(db, ctx, project_id).await?;

    let fence = geofence::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        name: Set(name),
        center_latitude: Set(centre.latitude),
        center_longitude: Set(centre.longitude),
        radius_meters: Set(input.radius_meters),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "geofence.create",
        "geofence",
        Some(fence.id.to_string()),
        None,
    )
    .await?;
    Ok(fence)
}

/// Fences around a project.
pub async fn list_geofences(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<geofence::Model>> {
    Geofence::find()
        .filter(geofence::Column::CompanyId.eq(ctx.company_id))
        .filter(geofence::Column::ProjectId.eq(project_id))
        .order_by_asc(geofence::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one fence.
pub async fn get_geofence(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    geofence_id: i64,
) -> Result<geofence::Model> {
    Geofence::find_by_id(geofence_id)
        .filter(geofence::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("geofence", geofence_id))
}

/// Enables or disables a fence.
pub async fn set_geofence_active(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    geofence_id: i64,
    is_active: bool,
) -> Result<geofence::Model> {
    let fence = get_geofence(db, ctx, geofence_id).await?;
    let mut active: geofence::ActiveModel = fence.into();
    active.is_active = Set(is_active);
    active.update(db).await.map_err(Into::into)
}

/// Input for [`submit_field_report`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewFieldReport {
    /// Reported latitude
    pub latitude: f64,
    /// Reported longitude
    pub longitude: f64,
    /// Report body
    pub notes: String,
}

/// Picks the nearest fence, and whether the point lies inside any of them.
fn nearest_fence(
    fences: &[geofence::Model],
    point: GeoPoint,
) -> Option<(&geofence::Model, GeofenceCheck, bool)> {
    let checks: Vec<_> = fences.iter().map(|f| (f, check_location(f, point))).collect();
    let inside_any = checks.iter().any(|(_, check)| check.inside);
    checks
        .into_iter()
        .min_by(|(_, a), (_, b)| a.distance_meters.total_cmp(&b.distance_meters))
        .map(|(fence, check)| (fence, check, inside_any))
}

/// Files a field report, verifying its position against the project's active fences.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id))]
pub async fn submit_field_report(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewFieldReport,
) -> Result<field_report::Model> {
    let point = GeoPoint::new(input.latitude, input.longitude)?;
    let notes = validate::require_text("Notes", &input.notes)?;
    project::get_project(db, ctx, project_id).await?;

    let fences: Vec<_> = list_geofences(db, ctx, project_id)
        .await?
        .into_iter()
        .filter(|f| f.is_active)
        .collect();

    let (geofence_id, distance, inside) = match nearest_fence(&fences, point) {
        Some((fence, check, inside_any)) => (Some(fence.id), Some(check.distance_meters), inside_any),
        None => (None, None, false),
    };

    if !inside {
        tracing::warn!(project_id, ?distance, "Field report filed outside every geofence");
    }

    let report = field_report::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        geofence_id: Set(geofence_id),
        reported_by: Set(ctx.user_id.clone()),
        latitude: Set(point.latitude),
        longitude: Set(point.longitude),
        notes: Set(notes),
        distance_meters: Set(distance),
        inside_geofence: Set(inside),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "field_report.create",
        "field_report",
        Some(report.id.to_string()),
        Some(if inside { "inside" } else { "outside" }.to_string()),
    )
    .await?;
    Ok(report)
}

/// Field reports for a project, newest first.
pub async fn list_field_reports(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<field_report::Model>> {
    FieldReport::find()
        .filter(field_report::Column::CompanyId.eq(ctx.company_id))
        .filter(field_report::Column::ProjectId.eq(project_id))
        .order_by_desc(field_report::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn point(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint::new(latitude, longitude).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude on this sphere is about 111.19 km
        let d = haversine_distance_meters(point(0.0, 0.0), point(1.0, 0.0));
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
        assert_eq!(haversine_distance_meters(point(51.5, -0.12), point(51.5, -0.12)), 0.0);
    }

    #[test]
    fn test_check_at_centre_and_boundary() {
        let centre = GeofenceCheck::from_distance(0.0, 150.0);
        assert!(centre.inside);
        assert_eq!(centre.proximity_percent, 100.0);

        let boundary = GeofenceCheck::from_distance(150.0, 150.0);
        assert!(boundary.inside);
        assert_eq!(boundary.proximity_percent, 0.0);

        let halfway = GeofenceCheck::from_distance(75.0, 150.0);
        assert_eq!(halfway.proximity_percent, 50.0);

        let outside = GeofenceCheck::from_distance(400.0, 150.0);
        assert!(!outside.inside);
        assert_eq!(outside.proximity_percent, 0.0);
    }

    #[test]
    fn test_zero_radius() {
        assert_eq!(GeofenceCheck::from_distance(0.0, 0.0).proximity_percent, 100.0);
        let away = GeofenceCheck::from_distance(1.0, 0.0);
        assert!(!away.inside);
        assert_eq!(away.proximity_percent, 0.0);
    }

    #[test]
    fn test_proximity_stays_in_range() {
        for distance in [0.0, 0.5, 10.0, 99.9, 100.0, 100.1, 1e7] {
            for radius in [0.0, 1.0, 100.0, 5_000.0] {
                let check = GeofenceCheck::from_distance(distance, radius);
                assert!((0.0..=100.0).contains(&check.proximity_percent));
                assert_eq!(check.inside, distance <= radius);
            }
        }
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[tokio::test]
    async fn test_field_report_picks_nearest_active_fence() -> Result<()> {
        let (db, ctx, project) = setup_with_project().await?;

        let gate = create_geofence(
            &db,
            &ctx,
            project.id,
            NewGeofence {
                name: "Gate".to_string(),
                center_latitude: 40.0,
                center_longitude: -75.0,
                radius_meters: 200.0,
            },
        )
        .await?;
        let yard = create_geofence(
            &db,
            &ctx,
            project.id,
            NewGeofence {
                name: "Yard".to_string(),
                center_latitude: 40.01,
                center_longitude: -75.0,
                radius_meters: 50.0,
            },
        )
        .await?;

        let report = submit_field_report(
            &db,
            &ctx,
            project.id,
            NewFieldReport {
                latitude: 40.0005,
                longitude: -75.0,
                notes: "Pour complete".to_string(),
            },
        )
        .await?;
        assert_eq!(report.geofence_id, Some(gate.id));
        assert!(report.inside_geofence);
        assert!(report.distance_meters.unwrap() < 100.0);

        set_geofence_active(&db, &ctx, gate.id, false).await?;
        let report = submit_field_report(
            &db,
            &ctx,
            project.id,
            NewFieldReport {
                latitude: 40.0005,
                longitude: -75.0,
                notes: "Second visit".to_string(),
            },
        )
        .await?;
        assert_eq!(report.geofence_id, Some(yard.id));
        assert!(!report.inside_geofence);

        assert_eq!(list_field_reports(&db, &ctx, project.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_field_report_without_fences() -> Result<()> {
        let (db, ctx, project) = setup_with_project().await?;
        let report = submit_field_report(
            &db,
            &ctx,
            project.id,
            NewFieldReport {
                latitude: 10.0,
                longitude: 10.0,
                notes: "Survey".to_string(),
            },
        )
        .await?;
        assert_eq!(report.geofence_id, None);
        assert_eq!(report.distance_meters, None);
        assert!(!report.inside_geofence);
        Ok(())
    }
}
