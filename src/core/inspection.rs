//! Quality inspections: checklist tracking, deficiencies and a validated
//! status lifecycle.
//!
//! ```text
//! scheduled -> in_progress -> completed
//!     |             |
//!     +-----------> failed
//! ```

use crate::{
    core::{audit, project, tenant::TenantContext, validate},
    entities::{
        QualityInspection, StringList,
        quality_inspection::{
            self, ChecklistItem, ChecklistItems, ChecklistStatus, Deficiencies, Deficiency,
            DeficiencySeverity, DeficiencyStatus, InspectionStatus,
        },
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Whether an inspection may move from `from` to `to`.
#[must_use]
pub fn can_transition(from: InspectionStatus, to: InspectionStatus) -> bool {
    use InspectionStatus::{Completed, Failed, InProgress, Scheduled};
    matches!(
        (from, to),
        (Scheduled, InProgress) | (Scheduled, Failed) | (InProgress, Completed) | (InProgress, Failed)
    )
}

/// Why an inspection cannot be completed yet, if anything blocks it.
#[must_use]
pub fn completion_blocker(inspection: &quality_inspection::Model) -> Option<String> {
    let failed: Vec<&str> = inspection
        .checklist_items
        .0
        .iter()
        .filter(|item| item.status == ChecklistStatus::Fail)
        .map(|item| item.id.as_str())
        .collect();
    if !failed.is_empty() {
        return Some(format!("checklist items failed: {}", failed.join(", ")));
    }

    let critical = inspection
        .deficiencies
        .0
        .iter()
        .filter(|d| d.severity == DeficiencySeverity::Critical && d.status == DeficiencyStatus::Open)
        .count();
    if critical > 0 {
        return Some(format!("{critical} critical deficiencies still open"));
    }
    None
}

/// Checklist completion figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChecklistProgress {
    /// Number of items
    pub total: usize,
    /// Items no longer pending
    pub evaluated: usize,
    /// Items that passed
    pub passed: usize,
    /// Items that failed
    pub failed: usize,
    /// `evaluated / total` as a percentage, 0 for an empty checklist
    pub percent: f64,
}

/// Computes checklist progress.
#[must_use]
pub fn checklist_progress(items: &[ChecklistItem]) -> ChecklistProgress {
    let count = |status| items.iter().filter(|i| i.status == status).count();
    let total = items.len();
    let evaluated = total - count(ChecklistStatus::Pending);

    #[allow(clippy::cast_precision_loss)]
    let percent = if total == 0 {
        0.0
    } else {
        evaluated as f64 / total as f64 * 100.0
    };

    ChecklistProgress {
        total,
        evaluated,
        passed: count(ChecklistStatus::Pass),
        failed: count(ChecklistStatus::Fail),
        percent,
    }
}

/// A checklist line supplied at creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    /// Caller-chosen id; assigned when absent
    #[serde(default)]
    pub id: Option<String>,
    /// What to check
    pub text: String,
    /// Who must act on it
    #[serde(default)]
    pub assignee: Option<String>,
    /// When it must be addressed
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Input for [`create_inspection`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewInspection {
    /// Title
    pub title: String,
    /// Inspector name
    pub inspector: String,
    /// Planned visit date
    pub scheduled_date: NaiveDate,
    /// Checklist
    #[serde(default)]
    pub checklist: Vec<NewChecklistItem>,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
}

fn build_checklist(items: Vec<NewChecklistItem>) -> Result<ChecklistItems> {
    let supplied: Vec<Option<String>> = items
        .iter()
        .map(|item| {
            item.id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect();

    // Caller ids are reserved first so generated ids never take them
    let mut taken: HashSet<String> = HashSet::with_capacity(items.len());
    for id in supplied.iter().flatten() {
        if !taken.insert(id.clone()) {
            return Err(Error::validation(format!("Duplicate checklist item id '{id}'")));
        }
    }

    let mut built: Vec<ChecklistItem> = Vec::with_capacity(items.len());
    let mut next = 1_usize;
    for (item, id) in items.into_iter().zip(supplied) {
        let text = validate::require_text("Checklist item", &item.text)?;
        let id = match id {
            Some(id) => id,
            None => {
                while taken.contains(&format!("item-{next}")) {
                    next += 1;
                }
                let id = format!("item-{next}");
                taken.insert(id.clone());
                id
            }
        };
        built.push(ChecklistItem {
            id,
            text,
            status: ChecklistStatus::Pending,
            photos: Vec::new(),
            assignee: item.assignee,
            due_date: item.due_date,
        });
    }
    Ok(ChecklistItems(built))
}

/// Schedules an inspection for one of the caller's projects.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id))]
pub async fn create_inspection(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewInspection,
) -> Result<quality_inspection::Model> {
    let title = validate::require_text("Title", &input.title)?;
    let inspector = validate::require_text("Inspector", &input.inspector)?;
    let checklist = build_checklist(input.checklist)?;
    project::get_project(db, ctx, project_id).await?;

    let inspection = quality_inspection::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        title: Set(title),
        inspector: Set(inspector),
        status: Set(InspectionStatus::Scheduled),
        scheduled_date: Set(input.scheduled_date),
        completed_at: Set(None),
        checklist_items: Set(checklist),
        deficiencies: Set(Deficiencies::default()),
        photos: Set(StringList::default()),
        notes: Set(input.notes),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "inspection.create",
        "quality_inspection",
        Some(inspection.id.to_string()),
        None,
    )
    .await?;
    Ok(inspection)
}

/// Optional filters for [`list_inspections`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectionFilter {
    /// Only this project
    pub project_id: Option<i64>,
    /// Only this status
    pub status: Option<InspectionStatus>,
}

/// Lists the caller's inspections by scheduled date.
pub async fn list_inspections(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    filter: &InspectionFilter,
) -> Result<Vec<quality_inspection::Model>> {
    let mut query = QualityInspection::find()
        .filter(quality_inspection::Column::CompanyId.eq(ctx.company_id));
    if let Some(project_id) = filter.project_id {
        query = query.filter(quality_inspection::Column::ProjectId.eq(project_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(quality_inspection::Column::Status.eq(status));
    }

    query
        .order_by_asc(quality_inspection::Column::ScheduledDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one inspection.
pub async fn get_inspection(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    inspection_id: i64,
) -> Result<quality_inspection::Model> {
    QualityInspection::find_by_id(inspection_id)
        .filter(quality_inspection::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("inspection", inspection_id))
}

/// Moves an inspection along its lifecycle.
///
/// Completing is refused while any checklist item has failed or a critical
/// deficiency is open; fail the inspection instead.
#[tracing::instrument(skip(db, ctx), fields(company_id = ctx.company_id))]
pub async fn transition_inspection(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    inspection_id: i64,
    to: InspectionStatus,
) -> Result<quality_inspection::Model> {
    let inspection = get_inspection(db, ctx, inspection_id).await?;
    let from = inspection.status;

    if !can_transition(from, to) {
        return Err(Error::InvalidTransition {
            entity: "inspection",
            from: from.to_value(),
            to: to.to_value(),
        });
    }
    if to == InspectionStatus::Completed {
        if let Some(reason) = completion_blocker(&inspection) {
            return Err(Error::validation(format!(
                "Inspection {inspection_id} cannot be completed: {reason}"
            )));
        }
    }

    let mut active: quality_inspection::ActiveModel = inspection.into();
    active.status = Set(to);
    if matches!(to, InspectionStatus::Completed | InspectionStatus::Failed) {
        active.completed_at = Set(Some(Utc::now()));
    }
    let updated = active.update(db).await?;

    audit::record(
        db,
        ctx,
        "inspection.status",
        "quality_inspection",
        Some(inspection_id.to_string()),
        Some(format!("{} -> {}", from.to_value(), to.to_value())),
    )
    .await?;
    Ok(updated)
}

/// Changes to a checklist item; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistItemUpdate {
    /// New outcome
    #[serde(default)]
    pub status: Option<ChecklistStatus>,
    /// New assignee
    #[serde(default)]
    pub assignee: Option<String>,
    /// New due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Photo URLs to append
    #[serde(default)]
    pub photos: Vec<String>,
}

fn ensure_open(inspection: &quality_inspection::Model) -> Result<()> {
    if matches!(
        inspection.status,
        InspectionStatus::Completed | InspectionStatus::Failed
    ) {
        return Err(Error::validation(format!(
            "Inspection {} is closed",
            inspection.id
        )));
    }
    Ok(())
}

/// Updates one checklist item of an open inspection.
pub async fn update_checklist_item(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    inspection_id: i64,
    item_id: &str,
    update: ChecklistItemUpdate,
) -> Result<quality_inspection::Model> {
    let inspection = get_inspection(db, ctx, inspection_id).await?;
    ensure_open(&inspection)?;

    let mut items = inspection.checklist_items.clone();
    let item = items
        .0
        .iter_mut()
        .find(|item| item.id == item_id)
        .ok_or_else(|| Error::not_found("checklist item", item_id))?;

    if let Some(status) = update.status {
        item.status = status;
    }
    if let Some(assignee) = update.assignee {
        item.assignee = Some(assignee);
    }
    if let Some(due_date) = update.due_date {
        item.due_date = Some(due_date);
    }
    for photo in update.photos {
        item.photos.push(validate::require_http_url(&photo)?);
    }

    let mut active: quality_inspection::ActiveModel = inspection.into();
    active.checklist_items = Set(items);
    active.update(db).await.map_err(Into::into)
}

/// Input for [`add_deficiency`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewDeficiency {
    /// What is wrong
    pub description: String,
    /// How bad it is
    pub severity: DeficiencySeverity,
    /// Who must fix it
    #[serde(default)]
    pub assignee: Option<String>,
    /// Fix-by date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Records a deficiency against an open inspection.
pub async fn add_deficiency(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    inspection_id: i64,
    input: NewDeficiency,
) -> Result<quality_inspection::Model> {
    let description = validate::require_text("Deficiency", &input.description)?;
    let inspection = get_inspection(db, ctx, inspection_id).await?;
    ensure_open(&inspection)?;

    let mut deficiencies = inspection.deficiencies.clone();
    let id = format!("def-{}", deficiencies.0.len() + 1);
    deficiencies.0.push(Deficiency {
        id: id.clone(),
        description,
        severity: input.severity,
        status: DeficiencyStatus::Open,
        assignee: input.assignee,
        due_date: input.due_date,
        resolved_at: None,
    });

    let mut active: quality_inspection::ActiveModel = inspection.into();
    active.deficiencies = Set(deficiencies);
    let updated = active.update(db).await?;

    audit::record(
        db,
        ctx,
        "inspection.deficiency",
        "quality_inspection",
        Some(inspection_id.to_string()),
        Some(id),
    )
    .await?;
    Ok(updated)
}

/// Marks a deficiency resolved.
pub async fn resolve_deficiency(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    inspection_id: i64,
    deficiency_id: &str,
) -> Result<quality_inspection::Model> {
    let inspection = get_inspection(db, ctx, inspection_id).await?;

    let mut deficiencies = inspection.deficiencies.clone();
    let deficiency = deficiencies
        .0
        .iter_mut()
        .find(|d| d.id == deficiency_id)
        .ok_or_else(|| Error::not_found("deficiency", deficiency_id))?;
    if deficiency.status == DeficiencyStatus::Resolved {
        return Err(Error::validation(format!(
            "Deficiency {deficiency_id} is already resolved"
        )));
    }
    deficiency.status = DeficiencyStatus::Resolved;
    deficiency.resolved_at = Some(Utc::now());

    let mut active: quality_inspection::ActiveModel = inspection.into();
    active.deficiencies = Set(deficiencies);
    active.update(db).await.map_err(Into::into)
}
