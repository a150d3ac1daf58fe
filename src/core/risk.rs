//! AI-assisted project risk assessment.
//!
//! The model is asked for a JSON [`RiskAssessment`]. A reply that cannot be
//! parsed or falls outside the allowed ranges is an [`Error::Upstream`];
//! nothing is stored and no score is invented in its place.

use crate::{
    core::{
        audit,
        finance::{self, ProjectFinancials},
        inspection::{self, InspectionFilter},
        project,
        tenant::TenantContext,
    },
    entities::{
        RiskAlert, RiskPrediction,
        project as project_entity,
        quality_inspection::{DeficiencyStatus, InspectionStatus},
        risk_alert,
        risk_prediction::{self, RiskFactor, RiskFactors, RiskLevel, RiskRecommendation, RiskRecommendations},
    },
    errors::{Error, Result},
    integrations::llm::{LanguageModel, complete_as},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a construction risk analyst. Reply with a single JSON object \
with the keys overall_score (0-100), summary (string), factors (array of {name, category, impact \
(0-100), description}) and recommendations (array of {title, priority, description}).";

/// The JSON shape requested from the model
#[derive(Debug, Clone, Deserialize)]
pub struct RiskAssessment {
    /// 0-100
    pub overall_score: f64,
    /// Narrative
    pub summary: String,
    /// Contributing factors
    #[serde(default)]
    pub factors: Vec<RiskFactor>,
    /// Mitigations
    #[serde(default)]
    pub recommendations: Vec<RiskRecommendation>,
}

fn in_percent_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

impl RiskAssessment {
    /// Rejects scores or impacts outside 0-100 and empty summaries.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::Upstream { message };

        if !in_percent_range(self.overall_score) {
            return Err(invalid(format!(
                "Risk score {} is outside 0-100",
                self.overall_score
            )));
        }
        if self.summary.trim().is_empty() {
            return Err(invalid("Risk assessment has no summary".to_string()));
        }
        if let Some(factor) = self.factors.iter().find(|f| !in_percent_range(f.impact)) {
            return Err(invalid(format!(
                "Impact {} of factor '{}' is outside 0-100",
                factor.impact, factor.name
            )));
        }
        Ok(())
    }

    /// Factors severe enough to raise an alert.
    pub fn alerting_factors(&self) -> impl Iterator<Item = (&RiskFactor, RiskLevel)> {
        self.factors
            .iter()
            .map(|f| (f, RiskLevel::from_score(f.impact)))
            .filter(|(_, level)| *level >= RiskLevel::High)
    }
}

/// Site quality figures fed into the prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualitySnapshot {
    /// Inspections that failed
    pub failed_inspections: usize,
    /// Deficiencies still open
    pub open_deficiencies: usize,
}

/// Builds the user prompt describing a project.
#[must_use]
pub fn build_risk_prompt(
    project: &project_entity::Model,
    financials: &ProjectFinancials,
    quality: QualitySnapshot,
) -> String {
    let schedule = match (project.start_date, project.end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        (Some(start), None) => format!("from {start}, no end date"),
        _ => "not scheduled".to_string(),
    };

    format!(
        "Project: {name}\nStatus: {status}\nSchedule: {schedule}\nCompletion: {completion:.0}%\n\
         Budget: {budget:.2}\nSpent: {spent:.2} ({utilization:.1}% of budget)\n\
         Invoiced: {invoiced:.2}, outstanding: {outstanding:.2}\n\
         Failed inspections: {failed}\nOpen deficiencies: {open}\n\
         Assess the delivery risk of this project.",
        name = project.name,
        status = project.status.to_value(),
        completion = project.completion_percentage,
        budget = financials.budget,
        spent = financials.total_spent,
        utilization = financials.budget_utilization,
        invoiced = financials.total_invoiced,
        outstanding = financials.outstanding,
        failed = quality.failed_inspections,
        open = quality.open_deficiencies,
    )
}

async fn quality_snapshot(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<QualitySnapshot> {
    let filter = InspectionFilter {
        project_id: Some(project_id),
        status: None,
    };
    let inspections = inspection::list_inspections(db, ctx, &filter).await?;

    Ok(QualitySnapshot {
        failed_inspections: inspections
            .iter()
            .filter(|i| i.status == InspectionStatus::Failed)
            .count(),
        open_deficiencies: inspections
            .iter()
            .flat_map(|i| &i.deficiencies.0)
            .filter(|d| d.status == DeficiencyStatus::Open)
            .count(),
    })
}

/// A stored prediction with the alerts it raised
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AssessmentOutcome {
    /// Stored prediction
    pub prediction: risk_prediction::Model,
    /// Alerts raised for high and critical factors
    pub alerts: Vec<risk_alert::Model>,
}

/// Asks the model to assess a project and stores the result.
#[tracing::instrument(skip(db, ctx, llm), fields(company_id = ctx.company_id))]
pub async fn assess_project_risk(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    llm: &dyn LanguageModel,
    project_id: i64,
) -> Result<AssessmentOutcome> {
    let project = project::get_project(db, ctx, project_id).await?;
    let financials = finance::project_financials(db, ctx, project_id).await?;
    let quality = quality_snapshot(db, ctx, project_id).await?;
    let prompt = build_risk_prompt(&project, &financials, quality);

    let assessment: RiskAssessment = complete_as(llm, SYSTEM_PROMPT, &prompt)
        .await
        .inspect_err(|e| tracing::error!(project_id, error = %e, "Risk assessment failed"))?;
    assessment.validate()?;

    let now = Utc::now();
    let level = RiskLevel::from_score(assessment.overall_score);
    let alert_specs: Vec<(RiskLevel, String)> = assessment
        .alerting_factors()
        .map(|(factor, level)| {
            (
                level,
                format!("{} ({}): {}", factor.name, factor.category, factor.description),
            )
        })
        .collect();

    let txn = db.begin().await?;
    let prediction = risk_prediction::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        overall_score: Set(assessment.overall_score),
        risk_level: Set(level),
        summary: Set(assessment.summary),
        factors: Set(RiskFactors(assessment.factors)),
        recommendations: Set(RiskRecommendations(assessment.recommendations)),
        model_name: Set(llm.model_name().to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut alerts = Vec::with_capacity(alert_specs.len());
    for (severity, message) in alert_specs {
        let alert = risk_alert::ActiveModel {
            company_id: Set(ctx.company_id),
            prediction_id: Set(prediction.id),
            project_id: Set(project_id),
            severity: Set(severity),
            message: Set(message),
            acknowledged: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        alerts.push(alert);
    }

    audit::record(
        &txn,
        ctx,
        "risk.assess",
        "risk_prediction",
        Some(prediction.id.to_string()),
        Some(format!("{:.0} {}", prediction.overall_score, level.to_value())),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        project_id,
        score = prediction.overall_score,
        alerts = alerts.len(),
        "Risk assessment stored"
    );
    Ok(AssessmentOutcome { prediction, alerts })
}

/// Predictions for a project, newest first.
pub async fn list_predictions(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<risk_prediction::Model>> {
    RiskPrediction::find()
        .filter(risk_prediction::Column::CompanyId.eq(ctx.company_id))
        .filter(risk_prediction::Column::ProjectId.eq(project_id))
        .order_by_desc(risk_prediction::Column::CreatedAt)
        .order_by_desc(risk_prediction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Unacknowledged alerts across the caller's projects, newest first.
pub async fn list_open_alerts(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<risk_alert::Model>> {
    RiskAlert::find()
        .filter(risk_alert::Column::CompanyId.eq(ctx.company_id))
        .filter(risk_alert::Column::Acknowledged.eq(false))
        .order_by_desc(risk_alert::Column::CreatedAt)
        .order_by_desc(risk_alert::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks an alert as seen.
pub async fn acknowledge_alert(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    alert_id: i64,
) -> Result<risk_alert::Model> {
    let alert = RiskAlert::find_by_id(alert_id)
        .filter(risk_alert::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("risk alert", alert_id))?;

    let mut active: risk_alert::ActiveModel = alert.into();
    active.acknowledged = Set(true);
    let updated = active.update(db).await?;

    audit::record(db, ctx, "risk_alert.acknowledge", "risk_alert", Some(alert_id.to_string()), None)
        .await?;
    Ok(updated)
}
