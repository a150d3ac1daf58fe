//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables
//! are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    AiModelConfiguration, ApiKey, AuditLog, CommunicationLog, CommunicationTemplate, Company,
    ComplianceReport, DataRetentionPolicy, Expense, FieldReport, GdprRequest, Geofence, Invoice,
    JobCost, JournalEntry, JournalLine, NotificationRule, Project, QualityInspection, RiskAlert,
    RiskPrediction, SocialPost, SocialPostQueue, Webhook,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Used when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/sitebook.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Directory that must exist before `SQLite` can create the file, if any.
fn sqlite_parent_dir(url: &str) -> Option<&str> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    let (dir, _) = path.rsplit_once('/')?;
    (!dir.is_empty()).then_some(dir)
}

/// Connects to the database named by `DATABASE_URL`.
///
/// Creates the parent directory of a file-backed `SQLite` database first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }

    tracing::info!(url = %database_url, "Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    db.execute(builder.build(table.if_not_exists())).await?;
    Ok(())
}

/// Creates every table that does not exist yet.
///
/// Safe to call on every startup.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Company).await?;
    create_table(db, &schema, Project).await?;
    create_table(db, &schema, JobCost).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, Expense).await?;
    create_table(db, &schema, JournalEntry).await?;
    create_table(db, &schema, JournalLine).await?;
    create_table(db, &schema, Geofence).await?;
    create_table(db, &schema, FieldReport).await?;
    create_table(db, &schema, QualityInspection).await?;
    create_table(db, &schema, AiModelConfiguration).await?;
    create_table(db, &schema, ApiKey).await?;
    create_table(db, &schema, Webhook).await?;
    create_table(db, &schema, CommunicationTemplate).await?;
    create_table(db, &schema, CommunicationLog).await?;
    create_table(db, &schema, NotificationRule).await?;
    create_table(db, &schema, AuditLog).await?;
    create_table(db, &schema, GdprRequest).await?;
    create_table(db, &schema, DataRetentionPolicy).await?;
    create_table(db, &schema, ComplianceReport).await?;
    create_table(db, &schema, RiskPrediction).await?;
    create_table(db, &schema, RiskAlert).await?;
    create_table(db, &schema, SocialPost).await?;
    create_table(db, &schema, SocialPostQueue).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, QuerySelect};

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir("sqlite://data/sitebook.sqlite?mode=rwc"),
            Some("data")
        );
        assert_eq!(sqlite_parent_dir("sqlite://sitebook.sqlite"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("postgres://db/app"), None);
    }

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Spot-check tables from each area
        Company::find().limit(1).all(&db).await?;
        JournalLine::find().limit(1).all(&db).await?;
        QualityInspection::find().limit(1).all(&db).await?;
        SocialPostQueue::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
