//! Financial tracking - job costs, invoices, expenses and the dashboards built on them.
//!
//! The aggregation functions are pure and operate on already-loaded rows so
//! they can be tested without a database.

use crate::{
    core::{audit, project::get_project, tenant::TenantContext, validate},
    entities::{
        Expense, Invoice, JobCost, Project, expense,
        invoice::{self, InvoiceStatus},
        job_cost, project,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input for [`create_job_cost`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewJobCost {
    /// Cost code category
    pub category: String,
    /// What was paid for
    pub description: String,
    /// Amount
    pub amount: f64,
    /// Date incurred
    pub cost_date: NaiveDate,
}

/// Input for [`create_invoice`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    /// Human-facing number
    pub invoice_number: String,
    /// Who is billed
    pub client_name: String,
    /// Billed amount
    pub amount: f64,
    /// Initial status, `draft` when absent
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    /// Issue date
    pub issue_date: NaiveDate,
    /// Due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Input for [`create_expense`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    /// Expense category
    pub category: String,
    /// Vendor
    #[serde(default)]
    pub vendor: Option<String>,
    /// Amount
    pub amount: f64,
    /// Date of the expense
    pub expense_date: NaiveDate,
}

/// Money position of a single project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectFinancials {
    /// Project id
    pub project_id: i64,
    /// Approved budget
    pub budget: f64,
    /// Sum of job costs
    pub total_job_costs: f64,
    /// Sum of expenses
    pub total_expenses: f64,
    /// Job costs plus expenses
    pub total_spent: f64,
    /// Budget minus spend (negative when over budget)
    pub remaining_budget: f64,
    /// Spend as a percentage of budget; 0 when the budget is 0
    pub budget_utilization: f64,
    /// Sum of all non-draft invoices
    pub total_invoiced: f64,
    /// Sum of paid invoices
    pub total_paid: f64,
    /// Invoiced but not yet paid
    pub outstanding: f64,
    /// Invoiced minus spent
    pub gross_margin: f64,
}

/// Company-wide overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDashboard {
    /// Number of projects
    pub project_count: usize,
    /// Project counts keyed by status
    pub projects_by_status: BTreeMap<String, u64>,
    /// Sum of project budgets
    pub total_budget: f64,
    /// Sum of job costs and expenses
    pub total_spent: f64,
    /// Sum of all non-draft invoices
    pub total_invoiced: f64,
    /// Mean completion percentage; 0 with no projects
    pub average_completion: f64,
}

/// Books a job cost against one of the caller's projects.
pub async fn create_job_cost(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewJobCost,
) -> Result<job_cost::Model> {
    validate::ensure_amount(input.amount)?;
    let category = validate::require_text("Category", &input.category)?;
    get_project(db, ctx, project_id).await?;

    let cost = job_cost::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        category: Set(category),
        description: Set(input.description),
        amount: Set(input.amount),
        cost_date: Set(input.cost_date),
        ..Default::default()
    };

    cost.insert(db).await.map_err(Into::into)
}

/// Job costs of a project, oldest first.
pub async fn list_job_costs(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<job_cost::Model>> {
    JobCost::find()
        .filter(job_cost::Column::CompanyId.eq(ctx.company_id))
        .filter(job_cost::Column::ProjectId.eq(project_id))
        .order_by_asc(job_cost::Column::CostDate)
        .order_by_asc(job_cost::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Issues an invoice for one of the caller's projects.
pub async fn create_invoice(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewInvoice,
) -> Result<invoice::Model> {
    validate::ensure_amount(input.amount)?;
    let invoice_number = validate::require_text("Invoice number", &input.invoice_number)?;
    let client_name = validate::require_text("Client name", &input.client_name)?;
    if let Some(due) = input.due_date {
        if due < input.issue_date {
            return Err(Error::validation("Invoice due date is before its issue date"));
        }
    }
    get_project(db, ctx, project_id).await?;

    let invoice = invoice::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        invoice_number: Set(invoice_number),
        client_name: Set(client_name),
        amount: Set(input.amount),
        status: Set(input.status.unwrap_or(InvoiceStatus::Draft)),
        issue_date: Set(input.issue_date),
        due_date: Set(input.due_date),
        ..Default::default()
    };

    invoice.insert(db).await.map_err(Into::into)
}

/// Invoices of a project, oldest first.
pub async fn list_invoices(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<invoice::Model>> {
    Invoice::find()
        .filter(invoice::Column::CompanyId.eq(ctx.company_id))
        .filter(invoice::Column::ProjectId.eq(project_id))
        .order_by_asc(invoice::Column::IssueDate)
        .order_by_asc(invoice::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes the payment state of an invoice.
pub async fn update_invoice_status(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    invoice_id: i64,
    status: InvoiceStatus,
) -> Result<invoice::Model> {
    let invoice = Invoice::find_by_id(invoice_id)
        .filter(invoice::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice_id))?;

    if !can_transition_invoice(invoice.status, status) {
        return Err(Error::InvalidTransition {
            entity: "invoice",
            from: invoice.status.to_value(),
            to: status.to_value(),
        });
    }

    let mut active: invoice::ActiveModel = invoice.into();
    active.status = Set(status);
    let updated = active.update(db).await?;

    audit::record(
        db,
        ctx,
        "invoice.status",
        "invoice",
        Some(invoice_id.to_string()),
        Some(status.to_value()),
    )
    .await?;

    Ok(updated)
}

/// Whether an invoice may move from `from` to `to`.
///
/// Paid invoices are closed.
#[must_use]
pub fn can_transition_invoice(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    use InvoiceStatus::{Draft, Overdue, Paid, Sent};
    matches!(
        (from, to),
        (Draft, Sent | Paid) | (Sent, Paid | Overdue) | (Overdue, Paid)
    )
}

/// Records an expense against one of the caller's projects.
pub async fn create_expense(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
    input: NewExpense,
) -> Result<expense::Model> {
    validate::ensure_amount(input.amount)?;
    let category = validate::require_text("Category", &input.category)?;
    get_project(db, ctx, project_id).await?;

    let expense = expense::ActiveModel {
        company_id: Set(ctx.company_id),
        project_id: Set(project_id),
        category: Set(category),
        vendor: Set(input.vendor),
        amount: Set(input.amount),
        expense_date: Set(input.expense_date),
        ..Default::default()
    };

    expense.insert(db).await.map_err(Into::into)
}

/// Expenses of a project, oldest first.
pub async fn list_expenses(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<Vec<expense::Model>> {
    Expense::find()
        .filter(expense::Column::CompanyId.eq(ctx.company_id))
        .filter(expense::Column::ProjectId.eq(project_id))
        .order_by_asc(expense::Column::ExpenseDate)
        .order_by_asc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a project's money rows and summarises them.
pub async fn project_financials(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    project_id: i64,
) -> Result<ProjectFinancials> {
    let project = get_project(db, ctx, project_id).await?;
    let costs = list_job_costs(db, ctx, project_id).await?;
    let expenses = list_expenses(db, ctx, project_id).await?;
    let invoices = list_invoices(db, ctx, project_id).await?;

    Ok(summarize_financials(&project, &costs, &expenses, &invoices))
}

/// Pure aggregation behind [`project_financials`].
#[must_use]
pub fn summarize_financials(
    project: &project::Model,
    costs: &[job_cost::Model],
    expenses: &[expense::Model],
    invoices: &[invoice::Model],
) -> ProjectFinancials {
    let total_job_costs: f64 = costs.iter().map(|c| c.amount).sum();
    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();
    let total_spent = total_job_costs + total_expenses;
    let total_invoiced = invoiced_total(invoices);
    let total_paid: f64 = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .map(|i| i.amount)
        .sum();

    ProjectFinancials {
        project_id: project.id,
        budget: project.budget,
        total_job_costs,
        total_expenses,
        total_spent,
        remaining_budget: project.budget - total_spent,
        budget_utilization: utilization_percent(total_spent, project.budget),
        total_invoiced,
        total_paid,
        outstanding: total_invoiced - total_paid,
        gross_margin: total_invoiced - total_spent,
    }
}

/// Company-wide totals across all of the caller's projects.
pub async fn company_dashboard(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<CompanyDashboard> {
    let projects = Project::find()
        .filter(project::Column::CompanyId.eq(ctx.company_id))
        .all(db)
        .await?;
    let costs = JobCost::find()
        .filter(job_cost::Column::CompanyId.eq(ctx.company_id))
        .all(db)
        .await?;
    let expenses = Expense::find()
        .filter(expense::Column::CompanyId.eq(ctx.company_id))
        .all(db)
        .await?;
    let invoices = Invoice::find()
        .filter(invoice::Column::CompanyId.eq(ctx.company_id))
        .all(db)
        .await?;

    Ok(summarize_company(&projects, &costs, &expenses, &invoices))
}

/// Pure aggregation behind [`company_dashboard`].
#[must_use]
pub fn summarize_company(
    projects: &[project::Model],
    costs: &[job_cost::Model],
    expenses: &[expense::Model],
    invoices: &[invoice::Model],
) -> CompanyDashboard {
    let mut projects_by_status = BTreeMap::new();
    for project in projects {
        *projects_by_status
            .entry(project.status.to_value())
            .or_insert(0) += 1;
    }

    let average_completion = if projects.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let count = projects.len() as f64;
        projects.iter().map(|p| p.completion_percentage).sum::<f64>() / count
    };

    CompanyDashboard {
        project_count: projects.len(),
        projects_by_status,
        total_budget: projects.iter().map(|p| p.budget).sum(),
        total_spent: costs.iter().map(|c| c.amount).sum::<f64>()
            + expenses.iter().map(|e| e.amount).sum::<f64>(),
        total_invoiced: invoiced_total(invoices),
        average_completion,
    }
}

fn invoiced_total(invoices: &[invoice::Model]) -> f64 {
    invoices
        .iter()
        .filter(|i| i.status != InvoiceStatus::Draft)
        .map(|i| i.amount)
        .sum()
}

/// Spend as a percentage of budget; 0 when the budget is 0.
#[must_use]
pub fn utilization_percent(spent: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        return 0.0;
    }
    (spent / budget) * 100.0
}
