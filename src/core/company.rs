//! Company (tenant) provisioning and lookup.

use crate::{
    core::validate::require_text,
    entities::{Company, company},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a company. Names are unique.
pub async fn create_company(
    db: &DatabaseConnection,
    name: &str,
    industry: Option<String>,
) -> Result<company::Model> {
    let name = require_text("Company name", name)?;

    if get_company_by_name(db, &name).await?.is_some() {
        return Err(Error::validation(format!("Company '{name}' already exists")));
    }

    let company = company::ActiveModel {
        name: Set(name),
        industry: Set(industry),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    company.insert(db).await.map_err(Into::into)
}

/// Finds a company by id.
pub async fn get_company(db: &DatabaseConnection, company_id: i64) -> Result<company::Model> {
    Company::find_by_id(company_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("company", company_id))
}

/// Finds a company by exact name.
pub async fn get_company_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<company::Model>> {
    Company::find()
        .filter(company::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All companies, alphabetically.
pub async fn list_companies(db: &DatabaseConnection) -> Result<Vec<company::Model>> {
    Company::find()
        .order_by_asc(company::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}
