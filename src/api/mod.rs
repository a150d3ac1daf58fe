//! HTTP surface.
//!
//! Handlers are thin: they resolve the [`TenantContext`](crate::core::tenant::TenantContext),
//! check a permission, call into [`crate::core`] and serialize the result.
//! Every error leaves through [`error::ApiError`].

pub mod admin;
pub mod communications;
pub mod compliance;
pub mod content;
pub mod error;
pub mod extract;
pub mod field;
pub mod inspections;
pub mod journal;
pub mod projects;
pub mod risk;
pub mod tenant;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    integrations::{LanguageModel, WebhookDispatcher},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::ApiError;

/// Result type of every handler
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Model used for content and risk assessments
    pub llm: Arc<dyn LanguageModel>,
    /// Outbound webhook client
    pub webhooks: WebhookDispatcher,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // projects and finance
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id/status", put(projects::update_status))
        .route("/projects/:id/completion", put(projects::update_completion))
        .route("/projects/:id/financials", get(projects::financials))
        .route(
            "/projects/:id/job-costs",
            get(projects::list_job_costs).post(projects::create_job_cost),
        )
        .route(
            "/projects/:id/invoices",
            get(projects::list_invoices).post(projects::create_invoice),
        )
        .route(
            "/projects/:id/expenses",
            get(projects::list_expenses).post(projects::create_expense),
        )
        .route("/invoices/:id/status", put(projects::update_invoice_status))
        .route("/dashboard", get(projects::dashboard))
        // journal
        .route(
            "/journal-entries",
            get(journal::list_entries).post(journal::create_entry),
        )
        .route("/journal-entries/:id", get(journal::get_entry))
        .route("/journal-balance", post(journal::check_balance))
        // field
        .route(
            "/projects/:id/geofences",
            get(field::list_geofences).post(field::create_geofence),
        )
        .route(
            "/projects/:id/field-reports",
            get(field::list_reports).post(field::submit_report),
        )
        .route("/geofences/:id/active", put(field::set_active))
        .route("/geofences/:id/check", post(field::check))
        // quality
        .route("/projects/:id/inspections", post(inspections::create))
        .route("/inspections", get(inspections::list))
        .route("/inspections/:id", get(inspections::get))
        .route("/inspections/:id/status", put(inspections::transition))
        .route(
            "/inspections/:id/items/:item_id",
            patch(inspections::update_item),
        )
        .route(
            "/inspections/:id/deficiencies",
            post(inspections::add_deficiency),
        )
        .route(
            "/inspections/:id/deficiencies/:deficiency_id/resolve",
            post(inspections::resolve_deficiency),
        )
        // risk
        .route("/projects/:id/risk-assessments", post(risk::assess))
        .route("/projects/:id/risk-predictions", get(risk::list_predictions))
        .route("/risk-alerts", get(risk::list_alerts))
        .route(
            "/risk-alerts/:id/acknowledge",
            post(risk::acknowledge_alert),
        )
        // communications
        .route(
            "/templates",
            get(communications::list_templates).post(communications::create_template),
        )
        .route(
            "/templates/:id/render",
            post(communications::render_template),
        )
        .route(
            "/communication-logs",
            get(communications::list_logs).post(communications::create_log),
        )
        .route(
            "/notification-rules",
            get(communications::list_rules).post(communications::create_rule),
        )
        .route(
            "/notification-rules/:id/toggle",
            post(communications::toggle_rule),
        )
        // compliance
        .route("/audit-logs", get(compliance::list_audit_logs))
        .route("/audit-logs/export", get(compliance::export_audit_logs))
        .route(
            "/gdpr-requests",
            get(compliance::list_gdpr_requests).post(compliance::create_gdpr_request),
        )
        .route(
            "/gdpr-requests/:id/status",
            put(compliance::transition_gdpr_request),
        )
        .route(
            "/retention-policies",
            get(compliance::list_retention_policies).post(compliance::create_retention_policy),
        )
        .route(
            "/retention-policies/:id/active",
            put(compliance::set_retention_policy_active),
        )
        .route("/retention-runs", post(compliance::apply_retention))
        .route(
            "/compliance-reports",
            get(compliance::list_reports).post(compliance::generate_report),
        )
        // content
        .route("/social-posts", get(content::list_posts))
        .route(
            "/social-post-queue",
            get(content::list_queue).post(content::enqueue),
        )
        // administration
        .route(
            "/api-keys",
            get(admin::list_api_keys).post(admin::create_api_key),
        )
        .route("/api-keys/:id", delete(admin::revoke_api_key))
        .route(
            "/webhooks",
            get(admin::list_webhooks).post(admin::create_webhook),
        )
        .route("/webhooks/:id", delete(admin::delete_webhook))
        .route("/webhooks/:id/ping", post(admin::ping_webhook))
        .route(
            "/ai-models",
            get(admin::list_models).post(admin::create_model),
        )
        .route("/ai-models/:id", delete(admin::delete_model))
        .route("/ai-models/:id/default", post(admin::set_default_model))
        .route("/resolve-model/:name", get(admin::resolve_model))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/functions/generate-social-content",
            post(content::generate),
        )
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        core::{
            api_key::{self, NewApiKey},
            tenant::TenantContext,
        },
        entities::company,
        errors::Result,
        test_utils::{CannedModel, setup_with_company},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, Response, header},
    };
    use tower::ServiceExt;

    async fn app_with_config(
        llm: CannedModel,
        config: AppConfig,
    ) -> Result<(Router, AppState, company::Model)> {
        let (db, company) = setup_with_company().await?;
        let state = AppState {
            db: Arc::new(db),
            llm: Arc::new(llm),
            webhooks: WebhookDispatcher::new()?,
            config: Arc::new(config),
        };
        Ok((router(state.clone()), state, company))
    }

    async fn app_with(llm: CannedModel) -> Result<(Router, AppState, company::Model)> {
        app_with_config(llm, AppConfig::default()).await
    }

    async fn app() -> Result<(Router, AppState, company::Model)> {
        app_with(CannedModel::failing()).await
    }

    fn as_user(company_id: i64, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(tenant::COMPANY_HEADER, company_id.to_string())
            .header(tenant::USER_HEADER, "site-manager");
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let (app, _, _) = app().await?;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_credentials_are_rejected() -> Result<()> {
        let (app, _, _) = app().await?;
        let response = app
            .oneshot(Request::get("/api/projects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Missing credentials"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_company_header_is_rejected() -> Result<()> {
        let (app, _, company) = app().await?;
        let response = app
            .oneshot(as_user(company.id + 100, "GET", "/api/projects", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_list_projects() -> Result<()> {
        let (app, _, company) = app().await?;

        let response = app
            .clone()
            .oneshot(as_user(
                company.id,
                "POST",
                "/api/projects",
                Some(json!({ "name": "Harbour Depot", "budget": 120000.0 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["name"], "Harbour Depot");
        assert_eq!(created["status"], "planning");

        let response = app
            .oneshot(as_user(company.id, "GET", "/api/projects", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_errors_are_400() -> Result<()> {
        let (app, _, company) = app().await?;
        let response = app
            .oneshot(as_user(
                company.id,
                "POST",
                "/api/projects",
                Some(json!({ "name": "Negative", "budget": -5.0 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_tenants_project_is_not_found() -> Result<()> {
        let (app, state, company) = app().await?;
        let other = crate::core::company::create_company(&state.db, "Other Co", None).await?;
        let ctx = TenantContext::user(other.id, "someone");
        let project =
            crate::test_utils::create_test_project(&state.db, &ctx, "Hidden", 10.0).await?;

        let response = app
            .oneshot(as_user(
                company.id,
                "GET",
                &format!("/api/projects/{}", project.id),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_journal_balance_preview() -> Result<()> {
        let (app, _, company) = app().await?;
        let response = app
            .oneshot(as_user(
                company.id,
                "POST",
                "/api/journal-balance",
                Some(json!({ "lines": [
                    { "account_code": "1000", "debit": 100.0 },
                    { "account_code": "4000", "credit": 90.0 }
                ]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["is_balanced"], false);
        assert_eq!(body["can_submit"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_unbalanced_entry_is_400() -> Result<()> {
        let (app, _, company) = app().await?;
        let response = app
            .oneshot(as_user(
                company.id,
                "POST",
                "/api/journal-entries",
                Some(json!({
                    "entry_date": "2026-03-01",
                    "description": "Materials",
                    "lines": [
                        { "account_code": "5000", "debit": 250.0 },
                        { "account_code": "2000", "credit": 200.0 }
                    ]
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_api_key_permissions_are_enforced() -> Result<()> {
        let (app, state, company) = app().await?;
        let ctx = TenantContext::user(company.id, "admin");
        let created = api_key::create_api_key(
            &state.db,
            &ctx,
            NewApiKey {
                name: "read-only".to_string(),
                permissions: vec!["projects:read".to_string()],
                rate_limit: None,
                expires_at: None,
            },
        )
        .await?;

        let read = Request::get("/api/projects")
            .header(tenant::API_KEY_HEADER, created.key.as_str())
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(read).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let write = Request::post("/api/projects")
            .header(tenant::API_KEY_HEADER, created.key.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "name": "X", "budget": 1.0 }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(write).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bogus = Request::get("/api/projects")
            .header(tenant::API_KEY_HEADER, "sb_not-a-real-key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(bogus).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_model_catalogue_needs_platform_admin() -> Result<()> {
        let mut config = AppConfig::default();
        config.admin.platform_admins = vec!["ops".to_string()];
        let (app, _, company) = app_with_config(CannedModel::failing(), config).await?;
        let model = json!({
            "provider": "openai",
            "model_name": "gpt-4o",
            "quality_rating": 5,
            "speed_rating": 3,
            "cost_rating": 2
        });

        let response = app
            .clone()
            .oneshot(as_user(company.id, "POST", "/api/ai-models", Some(model.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let operator = Request::post("/api/ai-models")
            .header(tenant::COMPANY_HEADER, company.id.to_string())
            .header(tenant::USER_HEADER, "ops")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(model.to_string()))
            .unwrap();
        let response = app.clone().oneshot(operator).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(as_user(company.id, "GET", "/api/ai-models", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_export_is_csv_attachment() -> Result<()> {
        let (app, _, company) = app().await?;
        app.clone()
            .oneshot(as_user(
                company.id,
                "POST",
                "/api/projects",
                Some(json!({ "name": "Audited", "budget": 10.0 })),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(as_user(company.id, "GET", "/api/audit-logs/export", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/csv"));
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.lines().count() >= 2);
        assert!(text.contains("project.create"));
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_content_malformed_json_is_400() -> Result<()> {
        let (app, _, _) = app().await?;
        let request = Request::post("/functions/generate-social-content")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_content_unknown_company_is_404() -> Result<()> {
        let (app, _, company) = app().await?;
        let request = Request::post("/functions/generate-social-content")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "company_id": company.id + 50 }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_content_uses_model_output() -> Result<()> {
        let (app, _, company) = app_with(CannedModel::replying(json!({
            "content": "Topping out ceremony today on the clinic site.",
            "hashtags": ["construction", "#milestone"]
        })))
        .await?;
        let request = Request::post("/functions/generate-social-content")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "company_id": company.id, "template_category": "project_milestone" })
                    .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["platforms_processed"], 4);
        assert_eq!(body["social_posts_created"], 4);
        assert_eq!(body["webhook_sent"], false);
        assert_eq!(body["posts"][0]["hashtags"][1], "milestone");
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() -> Result<()> {
        let (app, _, _) = app().await?;
        let request = Request::get("/health")
            .header(header::ORIGIN, "https://dashboard.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        Ok(())
    }
}
