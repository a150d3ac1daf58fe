//! AI model catalogue shared by every tenant.
//!
//! Rows are either concrete models or aliases that point at another row by
//! name. Aliases are resolved by following `points_to_model` until a concrete
//! model is reached.
//!
//! Because the catalogue is global, changing it requires
//! [`PLATFORM_ADMIN`]; tenant sessions can only read it.

use crate::{
    core::{
        audit,
        tenant::{PLATFORM_ADMIN, TenantContext},
        validate,
    },
    entities::{AiModelConfiguration, ai_model_configuration},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use std::collections::HashSet;

/// Longest alias chain [`resolve_model`] will follow
pub const MAX_ALIAS_DEPTH: usize = 8;

/// Input for [`create_model`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewAiModel {
    /// Vendor family
    pub provider: String,
    /// Model or alias name
    pub model_name: String,
    /// Display name; defaults to the model name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether this is an alias
    #[serde(default)]
    pub is_alias: bool,
    /// Alias target
    #[serde(default)]
    pub points_to_model: Option<String>,
    /// 1-5
    pub quality_rating: i32,
    /// 1-5
    pub speed_rating: i32,
    /// 1-5
    pub cost_rating: i32,
    /// Selection order, lowest first
    #[serde(default)]
    pub priority_order: i32,
}

fn ensure_rating(field: &str, value: i32) -> Result<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(format!("{field} must be between 1 and 5, got {value}")))
    }
}

/// Validates and inserts a catalogue row without auditing it.
pub async fn insert_model(
    db: &DatabaseConnection,
    input: NewAiModel,
) -> Result<ai_model_configuration::Model> {
    let provider = validate::require_text("Provider", &input.provider)?;
    let model_name = validate::require_text("Model name", &input.model_name)?;
    ensure_rating("Quality rating", input.quality_rating)?;
    ensure_rating("Speed rating", input.speed_rating)?;
    ensure_rating("Cost rating", input.cost_rating)?;

    let target = match (input.is_alias, input.points_to_model) {
        (true, Some(target)) => {
            let target = validate::require_text("Alias target", &target)?;
            if target == model_name {
                return Err(Error::validation("An alias cannot point at itself"));
            }
            Some(target)
        }
        (true, None) => return Err(Error::validation("An alias needs a target model")),
        (false, Some(_)) => {
            return Err(Error::validation("Only aliases may point at another model"));
        }
        (false, None) => None,
    };

    if AiModelConfiguration::find()
        .filter(ai_model_configuration::Column::ModelName.eq(model_name.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(Error::validation(format!("Model '{model_name}' already exists")));
    }

    if let Some(target) = &target {
        let conflicting = AiModelConfiguration::find()
            .filter(ai_model_configuration::Column::Provider.eq(provider.as_str()))
            .filter(ai_model_configuration::Column::IsAlias.eq(true))
            .filter(ai_model_configuration::Column::PointsToModel.ne(target.as_str()))
            .one(db)
            .await?;
        if let Some(existing) = conflicting {
            return Err(Error::validation(format!(
                "Provider '{provider}' already aliases '{}' via '{}'",
                existing.points_to_model.unwrap_or_default(),
                existing.model_name
            )));
        }
    }

    ai_model_configuration::ActiveModel {
        provider: Set(provider),
        display_name: Set(input.display_name.unwrap_or_else(|| model_name.clone())),
        model_name: Set(model_name),
        is_alias: Set(input.is_alias),
        points_to_model: Set(target),
        quality_rating: Set(input.quality_rating),
        speed_rating: Set(input.speed_rating),
        cost_rating: Set(input.cost_rating),
        priority_order: Set(input.priority_order),
        is_active: Set(true),
        is_default: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds a model or alias to the catalogue.
#[tracing::instrument(skip(db, ctx, input), fields(model = %input.model_name))]
pub async fn create_model(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewAiModel,
) -> Result<ai_model_configuration::Model> {
    ctx.require(PLATFORM_ADMIN)?;
    let model = insert_model(db, input).await?;
    audit::record(
        db,
        ctx,
        "ai_model.create",
        "ai_model_configuration",
        Some(model.id.to_string()),
        Some(model.model_name.clone()),
    )
    .await?;
    Ok(model)
}

/// Active models, best priority first.
pub async fn list_active_models(db: &DatabaseConnection) -> Result<Vec<ai_model_configuration::Model>> {
    AiModelConfiguration::find()
        .filter(ai_model_configuration::Column::IsActive.eq(true))
        .order_by_asc(ai_model_configuration::Column::PriorityOrder)
        .order_by_asc(ai_model_configuration::Column::ModelName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one catalogue row.
pub async fn get_model<C>(db: &C, model_id: i64) -> Result<ai_model_configuration::Model>
where
    C: ConnectionTrait,
{
    AiModelConfiguration::find_by_id(model_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ai model", model_id))
}

/// Removes a catalogue row that no alias points at.
pub async fn delete_model(db: &DatabaseConnection, ctx: &TenantContext, model_id: i64) -> Result<()> {
    ctx.require(PLATFORM_ADMIN)?;
    let model = get_model(db, model_id).await?;

    let dependents: Vec<String> = AiModelConfiguration::find()
        .filter(ai_model_configuration::Column::IsAlias.eq(true))
        .filter(ai_model_configuration::Column::PointsToModel.eq(model.model_name.as_str()))
        .all(db)
        .await?
        .into_iter()
        .map(|alias| alias.model_name)
        .collect();
    if !dependents.is_empty() {
        return Err(Error::validation(format!(
            "Model '{}' is the target of alias(es): {}",
            model.model_name,
            dependents.join(", ")
        )));
    }

    model.delete(db).await?;
    audit::record(
        db,
        ctx,
        "ai_model.delete",
        "ai_model_configuration",
        Some(model_id.to_string()),
        None,
    )
    .await?;
    Ok(())
}

/// Makes a model the default for its provider without auditing it.
///
/// Clearing the old default and setting the new one happen in one
/// transaction, so a provider never has two defaults.
pub async fn make_default(
    db: &DatabaseConnection,
    model_id: i64,
) -> Result<ai_model_configuration::Model> {
    let txn = db.begin().await?;

    let model = get_model(&txn, model_id).await?;
    AiModelConfiguration::update_many()
        .col_expr(ai_model_configuration::Column::IsDefault, Expr::value(false))
        .filter(ai_model_configuration::Column::Provider.eq(model.provider.as_str()))
        .filter(ai_model_configuration::Column::Id.ne(model_id))
        .exec(&txn)
        .await?;

    let mut active: ai_model_configuration::ActiveModel = model.into();
    active.is_default = Set(true);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(provider = %updated.provider, model = %updated.model_name, "Default model changed");
    Ok(updated)
}

/// Makes a model the default for its provider.
pub async fn set_default(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    model_id: i64,
) -> Result<ai_model_configuration::Model> {
    ctx.require(PLATFORM_ADMIN)?;
    let updated = make_default(db, model_id).await?;
    audit::record(
        db,
        ctx,
        "ai_model.default",
        "ai_model_configuration",
        Some(model_id.to_string()),
        Some(updated.provider.clone()),
    )
    .await?;
    Ok(updated)
}

/// Follows aliases from `name` through `catalogue` to a concrete model.
pub fn resolve_in<'a>(
    catalogue: &'a [ai_model_configuration::Model],
    name: &str,
) -> Result<&'a ai_model_configuration::Model> {
    let mut seen = HashSet::new();
    let mut current = name.to_string();

    for _ in 0..=MAX_ALIAS_DEPTH {
        let model = catalogue
            .iter()
            .find(|m| m.model_name == current)
            .ok_or_else(|| Error::not_found("ai model", &current))?;
        if !model.is_alias {
            return Ok(model);
        }
        if !seen.insert(model.model_name.as_str()) {
            return Err(Error::validation(format!("Alias cycle through '{current}'")));
        }
        current = model
            .points_to_model
            .clone()
            .ok_or_else(|| Error::validation(format!("Alias '{current}' has no target")))?;
    }

    Err(Error::validation(format!(
        "Alias chain from '{name}' is deeper than {MAX_ALIAS_DEPTH}"
    )))
}

/// Resolves a model name, following aliases.
pub async fn resolve_model(db: &DatabaseConnection, name: &str) -> Result<ai_model_configuration::Model> {
    let catalogue = AiModelConfiguration::find().all(db).await?;
    resolve_in(&catalogue, name).cloned()
}
