//! API keys for machine clients.
//!
//! Only a SHA-256 digest of each key is stored. The plaintext is returned
//! once, at creation, and every later request is matched by hashing the
//! presented key.

use crate::{
    core::{audit, tenant::TenantContext, validate},
    entities::{ApiKey, StringList, api_key},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Every generated key starts with this marker
pub const KEY_PREFIX: &str = "sb_";

/// Random characters after the marker
pub const KEY_RANDOM_LEN: usize = 40;

/// Characters of the key kept in clear for display
pub const DISPLAY_PREFIX_LEN: usize = 11;

/// Requests per hour when the creator does not choose a limit
pub const DEFAULT_RATE_LIMIT: i32 = 1000;

/// Generates a fresh plaintext key.
#[must_use]
pub fn generate_key() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{KEY_PREFIX}{random}")
}

/// Hex-encoded SHA-256 of a plaintext key.
#[must_use]
pub fn hash_key(raw_key: &str) -> String {
    format!("{:x}", Sha256::digest(raw_key.as_bytes()))
}

/// Input for [`create_api_key`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewApiKey {
    /// Label
    pub name: String,
    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Requests per rolling hour
    #[serde(default)]
    pub rate_limit: Option<i32>,
    /// Optional expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A newly created key; `key` is never retrievable again
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    /// Stored record (hash omitted when serialized)
    #[serde(flatten)]
    pub record: api_key::Model,
    /// Plaintext key
    pub key: String,
}

/// Issues a key for the caller's company.
#[tracing::instrument(skip(db, ctx, input), fields(company_id = ctx.company_id))]
pub async fn create_api_key(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    input: NewApiKey,
) -> Result<CreatedApiKey> {
    let name = validate::require_text("Key name", &input.name)?;
    let rate_limit = input.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
    if rate_limit <= 0 {
        return Err(Error::validation("Rate limit must be positive"));
    }
    let now = Utc::now();
    if input.expires_at.is_some_and(|expires| expires <= now) {
        return Err(Error::validation("Expiry must be in the future"));
    }
    let permissions = input
        .permissions
        .iter()
        .map(|p| validate::require_text("Permission", p))
        .collect::<Result<Vec<_>>>()?;
    // A key can only delegate what it holds itself
    if let Some(missing) = permissions.iter().find(|p| !ctx.can(p.as_str())) {
        return Err(Error::Forbidden {
            permission: missing.clone(),
        });
    }

    let key = generate_key();
    let record = api_key::ActiveModel {
        company_id: Set(ctx.company_id),
        name: Set(name),
        key_prefix: Set(key.chars().take(DISPLAY_PREFIX_LEN).collect()),
        key_hash: Set(hash_key(&key)),
        permissions: Set(StringList(permissions)),
        rate_limit: Set(rate_limit),
        usage_count: Set(0),
        window_started_at: Set(None),
        window_count: Set(0),
        expires_at: Set(input.expires_at),
        last_used_at: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    audit::record(
        db,
        ctx,
        "api_key.create",
        "api_key",
        Some(record.id.to_string()),
        Some(record.key_prefix.clone()),
    )
    .await?;
    tracing::info!(key_id = record.id, "API key issued");

    Ok(CreatedApiKey { record, key })
}

/// Rate-limit window after one more request at `now`.
///
/// Returns the window start and the count including this request, or
/// [`Error::RateLimited`] when the hour's quota is used up.
pub fn next_window(key: &api_key::Model, now: DateTime<Utc>) -> Result<(DateTime<Utc>, i32)> {
    let (started, count) = match key.window_started_at {
        Some(started) if now - started < Duration::hours(1) => (started, key.window_count),
        _ => (now, 0),
    };
    if count >= key.rate_limit {
        return Err(Error::RateLimited {
            limit: key.rate_limit,
        });
    }
    Ok((started, count + 1))
}

/// Resolves a presented key to a tenant context, counting the request.
pub async fn authenticate(db: &DatabaseConnection, raw_key: &str) -> Result<TenantContext> {
    authenticate_at(db, raw_key, Utc::now()).await
}

/// [`authenticate`] with an explicit clock.
pub async fn authenticate_at(
    db: &DatabaseConnection,
    raw_key: &str,
    now: DateTime<Utc>,
) -> Result<TenantContext> {
    let unauthorized = |message: &str| Error::Unauthorized {
        message: message.to_string(),
    };

    if !raw_key.starts_with(KEY_PREFIX) {
        return Err(unauthorized("Malformed API key"));
    }
    let key = ApiKey::find()
        .filter(api_key::Column::KeyHash.eq(hash_key(raw_key)))
        .one(db)
        .await?
        .ok_or_else(|| unauthorized("Unknown API key"))?;

    if !key.is_active {
        return Err(unauthorized("API key revoked"));
    }
    if key.expires_at.is_some_and(|expires| expires <= now) {
        return Err(unauthorized("API key expired"));
    }

    let (window_started, window_count) = next_window(&key, now).inspect_err(|_| {
        tracing::warn!(key_id = key.id, "API key rate limit exceeded");
    })?;

    let ctx = TenantContext::api_key(key.company_id, key.id, key.permissions.0.clone());
    let usage_count = key.usage_count + 1;
    let mut active: api_key::ActiveModel = key.into();
    active.usage_count = Set(usage_count);
    active.window_started_at = Set(Some(window_started));
    active.window_count = Set(window_count);
    active.last_used_at = Set(Some(now));
    active.update(db).await?;

    Ok(ctx)
}

/// The caller's keys, newest first.
pub async fn list_api_keys(db: &DatabaseConnection, ctx: &TenantContext) -> Result<Vec<api_key::Model>> {
    ApiKey::find()
        .filter(api_key::Column::CompanyId.eq(ctx.company_id))
        .order_by_desc(api_key::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deactivates a key; it can never authenticate again.
pub async fn revoke_api_key(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    key_id: i64,
) -> Result<api_key::Model> {
    let key = ApiKey::find_by_id(key_id)
        .filter(api_key::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("api key", key_id))?;

    let mut active: api_key::ActiveModel = key.into();
    active.is_active = Set(false);
    let revoked = active.update(db).await?;

    audit::record(db, ctx, "api_key.revoke", "api_key", Some(key_id.to_string()), None).await?;
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn new_key(rate_limit: i32) -> NewApiKey {
        NewApiKey {
            name: "ERP sync".to_string(),
            permissions: vec!["projects:read".to_string()],
            rate_limit: Some(rate_limit),
            expires_at: None,
        }
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + KEY_RANDOM_LEN);
        assert!(key[KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_key(), key);
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_key("sb_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_key("sb_abc"));
        assert_ne!(hash, hash_key("sb_abd"));
        assert_eq!(
            hash_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_authenticate_and_rate_limit() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let admin = TenantContext::user(company.id, "admin");
        let created = create_api_key(&db, &admin, new_key(2)).await?;
        assert_eq!(created.record.key_prefix.len(), DISPLAY_PREFIX_LEN);
        assert_ne!(created.record.key_hash, created.key);

        let now = Utc::now();
        let ctx = authenticate_at(&db, &created.key, now).await?;
        assert_eq!(ctx.company_id, company.id);
        assert!(ctx.can("projects:read"));
        assert!(!ctx.can("projects:write"));

        authenticate_at(&db, &created.key, now).await?;
        let limited = authenticate_at(&db, &created.key, now).await;
        assert!(matches!(limited, Err(Error::RateLimited { limit: 2 })));

        let next_hour = now + Duration::minutes(61);
        authenticate_at(&db, &created.key, next_hour).await?;

        let stored = list_api_keys(&db, &admin).await?;
        assert_eq!(stored[0].usage_count, 3);
        assert_eq!(stored[0].window_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_revoked_and_unknown_keys_are_rejected() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let admin = TenantContext::user(company.id, "admin");
        let created = create_api_key(&db, &admin, new_key(10)).await?;

        revoke_api_key(&db, &admin, created.record.id).await?;
        assert!(matches!(
            authenticate(&db, &created.key).await,
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            authenticate(&db, &generate_key()).await,
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            authenticate(&db, "not-a-key").await,
            Err(Error::Unauthorized { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_validates_input() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let admin = TenantContext::user(company.id, "admin");
        assert!(create_api_key(&db, &admin, new_key(0)).await.is_err());

        let mut expired = new_key(5);
        expired.expires_at = Some(Utc::now() - Duration::days(1));
        assert!(create_api_key(&db, &admin, expired).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_key_cannot_grant_more_than_it_holds() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let limited = TenantContext::api_key(
            company.id,
            1,
            vec!["admin:write".to_string(), "finance:read".to_string()],
        );

        let mut wildcard = new_key(10);
        wildcard.permissions = vec!["*".to_string()];
        assert!(matches!(
            create_api_key(&db, &limited, wildcard).await,
            Err(Error::Forbidden { permission }) if permission == "*"
        ));

        let mut wider = new_key(10);
        wider.permissions = vec!["finance:read".to_string(), "finance:write".to_string()];
        assert!(matches!(
            create_api_key(&db, &limited, wider).await,
            Err(Error::Forbidden { permission }) if permission == "finance:write"
        ));

        let mut subset = new_key(10);
        subset.permissions = vec!["finance:read".to_string()];
        let created = create_api_key(&db, &limited, subset).await?;
        assert_eq!(created.record.permissions.0, vec!["finance:read"]);

        // Interactive sessions hold every permission
        let admin = TenantContext::user(company.id, "admin");
        let mut full = new_key(10);
        full.permissions = vec!["*".to_string()];
        assert!(create_api_key(&db, &admin, full).await.is_ok());
        Ok(())
    }
}
