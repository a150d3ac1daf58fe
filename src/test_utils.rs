//! Shared test utilities.
//!
//! Helpers for setting up in-memory databases seeded with a tenant and a
//! project, plus a canned [`LanguageModel`] for code that calls the LLM.

use crate::{
    core::{
        company,
        project::{self, NewProject},
        tenant::TenantContext,
    },
    entities::{company as company_entity, project as project_entity},
    errors::{Error, Result},
    integrations::LanguageModel,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Test database with one company.
pub async fn setup_with_company() -> Result<(DatabaseConnection, company_entity::Model)> {
    let db = setup_test_db().await?;
    let company = company::create_company(&db, "Northwind Builders", Some("commercial".into())).await?;
    Ok((db, company))
}

/// Test database with one company, a user context for it and one project.
///
/// # Defaults
/// * user: "site-manager"
/// * project: "Riverside Clinic", budget 250 000, status `planning`
pub async fn setup_with_project()
-> Result<(DatabaseConnection, TenantContext, project_entity::Model)> {
    let (db, company) = setup_with_company().await?;
    let ctx = TenantContext::user(company.id, "site-manager");
    let project = create_test_project(&db, &ctx, "Riverside Clinic", 250_000.0).await?;
    Ok((db, ctx, project))
}

/// Creates a project with sensible defaults.
pub async fn create_test_project(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    name: &str,
    budget: f64,
) -> Result<project_entity::Model> {
    project::create_project(
        db,
        ctx,
        NewProject {
            name: name.to_string(),
            description: None,
            budget,
            status: None,
            start_date: None,
            end_date: None,
        },
    )
    .await
}

/// A language model that always gives the same answer.
///
/// `None` simulates an outage.
pub struct CannedModel {
    reply: Option<serde_json::Value>,
    calls: AtomicUsize,
}

impl CannedModel {
    /// Model answering every prompt with `reply`.
    pub fn replying(reply: serde_json::Value) -> Self {
        Self {
            reply: Some(reply),
            calls: AtomicUsize::new(0),
        }
    }

    /// Model whose every call fails.
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of prompts received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    fn model_name(&self) -> &str {
        "canned-model"
    }

    async fn complete_json(&self, _system: &str, _prompt: &str) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| Error::Upstream {
            message: "canned outage".to_string(),
        })
    }
}
