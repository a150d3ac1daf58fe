//! Explicit tenant context.
//!
//! Every core function takes a [`TenantContext`] parameter instead of reading
//! the current user or company from ambient state, so the data flow for each
//! query is visible at the call site.

use crate::errors::{Error, Result};

/// Permission for changes that affect every tenant, such as the AI model catalogue
pub const PLATFORM_ADMIN: &str = "platform:admin";

/// Namespace that wildcards and interactive sessions never cover
const PLATFORM_NAMESPACE: &str = "platform";

/// Who is acting, and on behalf of which company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// Tenant every query is scoped to
    pub company_id: i64,
    /// Actor recorded in audit logs
    pub user_id: String,
    /// `None` for an interactive session (all tenant permissions), `Some` for API keys
    pub permissions: Option<Vec<String>>,
    /// Operator of the whole installation, not just this tenant
    pub platform_admin: bool,
}

impl TenantContext {
    /// Context for an interactive user session.
    pub fn user(company_id: i64, user_id: impl Into<String>) -> Self {
        Self {
            company_id,
            user_id: user_id.into(),
            permissions: None,
            platform_admin: false,
        }
    }

    /// Context for a request authenticated with an API key.
    #[must_use]
    pub fn api_key(company_id: i64, key_id: i64, permissions: Vec<String>) -> Self {
        Self {
            company_id,
            user_id: format!("api_key:{key_id}"),
            permissions: Some(permissions),
            platform_admin: false,
        }
    }

    /// Context for server-side handlers that act for a company without a user.
    #[must_use]
    pub fn system(company_id: i64) -> Self {
        Self {
            company_id,
            user_id: "system".to_string(),
            permissions: None,
            platform_admin: false,
        }
    }

    /// Grants [`PLATFORM_ADMIN`] on top of the existing permissions.
    #[must_use]
    pub fn with_platform_admin(mut self) -> Self {
        self.platform_admin = true;
        self
    }

    /// Whether the caller holds `permission`.
    ///
    /// Grants match exactly, by `resource:*` wildcard, or by a bare `*`.
    /// `platform:` permissions need the platform admin flag or an exact grant.
    #[must_use]
    pub fn can(&self, permission: &str) -> bool {
        let resource = permission.split(':').next().unwrap_or(permission);
        if resource == PLATFORM_NAMESPACE {
            return self.platform_admin
                || self
                    .permissions
                    .as_ref()
                    .is_some_and(|granted| granted.iter().any(|grant| grant == permission));
        }

        let Some(granted) = &self.permissions else {
            return true;
        };
        granted.iter().any(|grant| {
            grant == "*" || grant == permission || *grant == format!("{resource}:*")
        })
    }

    /// Fails with [`Error::Forbidden`] unless the caller holds `permission`.
    pub fn require(&self, permission: &str) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(Error::Forbidden {
                permission: permission.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_session_has_every_permission() {
        let ctx = TenantContext::user(1, "alice");
        assert!(ctx.can("projects:write"));
        assert!(ctx.require("compliance:read").is_ok());
    }

    #[test]
    fn test_api_key_permissions_are_checked() {
        let ctx = TenantContext::api_key(1, 7, vec!["projects:read".to_string()]);
        assert_eq!(ctx.user_id, "api_key:7");
        assert!(ctx.can("projects:read"));
        assert!(!ctx.can("projects:write"));
        assert!(matches!(
            ctx.require("finance:read"),
            Err(Error::Forbidden { permission }) if permission == "finance:read"
        ));
    }

    #[test]
    fn test_wildcard_grants() {
        let scoped = TenantContext::api_key(1, 1, vec!["finance:*".to_string()]);
        assert!(scoped.can("finance:write"));
        assert!(!scoped.can("projects:read"));

        let all = TenantContext::api_key(1, 2, vec!["*".to_string()]);
        assert!(all.can("anything:at_all"));
    }

    #[test]
    fn test_platform_permission_needs_explicit_grant() {
        let session = TenantContext::user(1, "alice");
        assert!(!session.can(PLATFORM_ADMIN));
        assert!(session.clone().with_platform_admin().can(PLATFORM_ADMIN));

        let wildcard = TenantContext::api_key(1, 3, vec!["*".to_string()]);
        assert!(!wildcard.can(PLATFORM_ADMIN));
        let scoped = TenantContext::api_key(1, 4, vec!["platform:*".to_string()]);
        assert!(!scoped.can(PLATFORM_ADMIN));
        let exact = TenantContext::api_key(1, 5, vec![PLATFORM_ADMIN.to_string()]);
        assert!(exact.can(PLATFORM_ADMIN));
    }
}
