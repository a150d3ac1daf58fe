//! Project business logic - creation, lookup and status tracking.
//!
//! Every lookup is scoped to the caller's company; a project that exists but
//! belongs to another tenant is reported as not found.

use crate::{
    core::{audit, tenant::TenantContext, validate},
    entities::{
        Project,
        project::{self, ProjectStatus},
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Input for [`create_project`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    /// Project name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Approved budget
    pub budget: f64,
    /// Initial status, `planning` when absent
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    /// Planned start
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Planned end
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Creates a project for the caller's company.
#[tracing::instrument(skip(db, input), fields(company_id = ctx.company_id))]
pub async fn create_project(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewProject,
) -> Result<project::Model> {
    let name = validate::require_text("Project name", &input.name)?;
    validate::ensure_amount(input.budget)?;

    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(Error::validation("Project end date is before its start date"));
        }
    }

    let project = project::ActiveModel {
        company_id: Set(ctx.company_id),
        name: Set(name),
        description: Set(input.description),
        budget: Set(input.budget),
        status: Set(input.status.unwrap_or(ProjectStatus::Planning)),
        completion_percentage: Set(0.0),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = project.insert(db).await?;
    audit::record(
        db,
        ctx,
        "project.create",
        "project",
        Some(result.id.to_string()),
        Some(format!("budget {:.2}", result.budget)),
    )
    .await?;
    tracing::info!(project_id = result.id, "Project created");

    Ok(result)
}

/// Lists the caller's projects alphabetically, optionally filtered by status.
pub async fn list_projects(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    status: Option<ProjectStatus>,
) -> Result<Vec<project::Model>> {
    let mut query = Project::find().filter(project::Column::CompanyId.eq(ctx.company_id));
    if let Some(status) = status {
        query = query.filter(project::Column::Status.eq(status));
    }

    query
        .order_by_asc(project::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one of the caller's projects.
pub async fn get_project<C>(db: &C, ctx: &TenantContext, project_id: i64) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    Project::find_by_id(project_id)
        .filter(project::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("project", project_id))
}

/// Whether a project may move from `from` to `to`.
///
/// Completed and cancelled projects are closed.
#[must_use]
pub fn can_transition(from: ProjectStatus, to: ProjectStatus) -> bool {
    use ProjectStatus::{Active, Cancelled, Completed, OnHold, Planning};
    matches!(
        (from, to),
        (Planning, Active | Cancelled) | (Active, OnHold | Completed | Cancelled) | (OnHold, Active | Cancelled)
    )
}

/// Moves a project to a new status.
pub async fn update_project_status(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    status: ProjectStatus,
) -> Result<project::Model> {
    let project = get_project(db, ctx, project_id).await?;
    let previous = project.status;
    if !can_transition(previous, status) {
        return Err(Error::InvalidTransition {
            entity: "project",
            from: previous.to_value(),
            to: status.to_value(),
        });
    }

    let mut active: project::ActiveModel = project.into();
    active.status = Set(status);
    if status == ProjectStatus::Completed {
        active.completion_percentage = Set(100.0);
    }
    let updated = active.update(db).await?;

    audit::record(
        db,
        ctx,
        "project.status",
        "project",
        Some(project_id.to_string()),
        Some(format!("{} -> {}", previous.to_value(), status.to_value())),
    )
    .await?;

    Ok(updated)
}

/// Records site progress; must lie within 0-100.
pub async fn update_completion(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    completion_percentage: f64,
) -> Result<project::Model> {
    if !completion_percentage.is_finite() || !(0.0..=100.0).contains(&completion_percentage) {
        return Err(Error::validation(format!(
            "Completion must be between 0 and 100, got {completion_percentage}"
        )));
    }

    let project = get_project(db, ctx, project_id).await?;
    let mut active: project::ActiveModel = project.into();
    active.completion_percentage = Set(completion_percentage);
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_project(name: &str, budget: f64) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: None,
            budget,
            status: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_project_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = TenantContext::user(1, "alice");

        let result = create_project(&db, &ctx, new_project(" ", 100.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_project(&db, &ctx, new_project("Depot", -5.0)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount }) if amount == -5.0));

        let mut backwards = new_project("Depot", 5.0);
        backwards.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        backwards.end_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        let result = create_project(&db, &ctx, backwards).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_project_is_tenant_scoped() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "alice");
        let project = create_project(&db, &ctx, new_project("Depot", 50_000.0)).await?;

        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(get_project(&db, &ctx, project.id).await?, project);

        let stranger = TenantContext::user(company.id + 1, "mallory");
        assert!(matches!(
            get_project(&db, &stranger, project.id).await,
            Err(Error::NotFound { entity: "project", .. })
        ));
        assert!(list_projects(&db, &stranger, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_status_and_completion_updates() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::user(company.id, "alice");
        let project = create_project(&db, &ctx, new_project("Depot", 1.0)).await?;

        let active = update_project_status(&db, &ctx, project.id, ProjectStatus::Active).await?;
        assert_eq!(active.status, ProjectStatus::Active);
        let listed = list_projects(&db, &ctx, Some(ProjectStatus::Active)).await?;
        assert_eq!(listed.len(), 1);

        let progressed = update_completion(&db, &ctx, project.id, 42.5).await?;
        assert_eq!(progressed.completion_percentage, 42.5);
        assert!(update_completion(&db, &ctx, project.id, 101.0).await.is_err());

        let done = update_project_status(&db, &ctx, project.id, ProjectStatus::Completed).await?;
        assert_eq!(done.completion_percentage, 100.0);

        assert!(matches!(
            update_project_status(&db, &ctx, project.id, ProjectStatus::Active).await,
            Err(Error::InvalidTransition { entity: "project", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_project_transitions() {
        use ProjectStatus::{Active, Cancelled, Completed, OnHold, Planning};
        assert!(can_transition(Planning, Active));
        assert!(can_transition(Active, OnHold));
        assert!(can_transition(OnHold, Active));
        assert!(can_transition(Active, Completed));
        assert!(!can_transition(Planning, Completed));
        assert!(!can_transition(Completed, Active));
        assert!(!can_transition(Cancelled, Planning));
        assert!(!can_transition(Active, Active));
    }
}
