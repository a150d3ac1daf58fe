//! Resolves the [`TenantContext`] of a request.
//!
//! Machine clients send `x-api-key`. Interactive sessions arrive through the
//! auth gateway, which sets `x-company-id` and `x-user-id`. Users listed in
//! `[admin] platform_admins` also receive `platform:admin`.

use super::{AppState, error::ApiError};
use crate::{
    core::{api_key, company, tenant::TenantContext},
    errors::Error,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// API key header
pub const API_KEY_HEADER: &str = "x-api-key";
/// Company header set by the auth gateway
pub const COMPANY_HEADER: &str = "x-company-id";
/// User header set by the auth gateway
pub const USER_HEADER: &str = "x-user-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn unauthorized(message: &str) -> ApiError {
    ApiError(Error::Unauthorized {
        message: message.to_string(),
    })
}

#[async_trait]
impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(raw_key) = header(&parts.headers, API_KEY_HEADER) {
            return Ok(api_key::authenticate(&state.db, raw_key).await?);
        }

        let (Some(company_id), Some(user_id)) = (
            header(&parts.headers, COMPANY_HEADER),
            header(&parts.headers, USER_HEADER),
        ) else {
            return Err(unauthorized("Missing credentials"));
        };

        let company_id: i64 = company_id
            .parse()
            .map_err(|_| unauthorized("Malformed company id"))?;
        company::get_company(&state.db, company_id)
            .await
            .map_err(|e| match e {
                Error::NotFound { .. } => unauthorized("Unknown company"),
                other => ApiError(other),
            })?;

        let ctx = Self::user(company_id, user_id);
        if state.config.admin.is_platform_admin(user_id) {
            return Ok(ctx.with_platform_admin());
        }
        Ok(ctx)
    }
}
