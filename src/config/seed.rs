//! Startup seeding from config.toml.
//!
//! Rows that already exist are left untouched, so seeding runs on every
//! start without duplicating anything.

use crate::{
    config::app::{AiModelSeed, CompanySeed},
    core::{ai_model, company},
    entities::{AiModelConfiguration, ai_model_configuration},
    errors::Result,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Creates the configured companies that do not exist yet; returns how many were created.
#[tracing::instrument(skip(db, seeds))]
pub async fn seed_companies(db: &DatabaseConnection, seeds: &[CompanySeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if company::get_company_by_name(db, seed.name.trim()).await?.is_some() {
            tracing::debug!(name = %seed.name, "Company already exists, skipping");
            continue;
        }
        company::create_company(db, &seed.name, seed.industry.clone()).await?;
        created += 1;
    }
    tracing::info!(created, configured = seeds.len(), "Companies seeded");
    Ok(created)
}

/// Creates the configured AI catalogue rows that do not exist yet.
///
/// A seed marked `is_default` becomes its provider's default only when it was
/// created by this run.
#[tracing::instrument(skip(db, seeds))]
pub async fn seed_ai_models(db: &DatabaseConnection, seeds: &[AiModelSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let exists = AiModelConfiguration::find()
            .filter(ai_model_configuration::Column::ModelName.eq(seed.model.model_name.trim()))
            .one(db)
            .await?
            .is_some();
        if exists {
            tracing::debug!(model = %seed.model.model_name, "AI model already exists, skipping");
            continue;
        }

        let model = ai_model::insert_model(db, seed.model.clone()).await?;
        if seed.is_default {
            ai_model::make_default(db, model.id).await?;
        }
        created += 1;
    }
    tracing::info!(created, configured = seeds.len(), "AI models seeded");
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{config::AppConfig, test_utils::setup_test_db};

    fn seeds() -> AppConfig {
        toml::from_str(
            r#"
            [[companies]]
            name = "Northwind Builders"

            [[companies]]
            name = "Harbor Civil"
            industry = "infrastructure"

            [[ai_models]]
            provider = "openai"
            model_name = "gpt-4o"
            quality_rating = 5
            speed_rating = 3
            cost_rating = 2
            is_default = true

            [[ai_models]]
            provider = "openai"
            model_name = "openai-best"
            is_alias = true
            points_to_model = "gpt-4o"
            quality_rating = 5
            speed_rating = 3
            cost_rating = 2
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config = seeds();
        assert_eq!(config.companies.len(), 2);

        assert_eq!(seed_companies(&db, &config.companies).await?, 2);
        assert_eq!(seed_ai_models(&db, &config.ai_models).await?, 2);

        assert_eq!(seed_companies(&db, &config.companies).await?, 0);
        assert_eq!(seed_ai_models(&db, &config.ai_models).await?, 0);

        assert_eq!(company::list_companies(&db).await?.len(), 2);
        let resolved = ai_model::resolve_model(&db, "openai-best").await?;
        assert!(resolved.is_default);
        Ok(())
    }
}
