//! Social media content generation.
//!
//! One run produces a post per platform. Each post is requested from the
//! language model as JSON; when the model is unavailable or its reply is
//! unusable, a deterministic template for the category and platform is used
//! instead, so a run always yields a post for every platform.

use crate::{
    core::{audit, communication::render, company, tenant::TenantContext, validate},
    entities::{
        SocialPost, SocialPostQueue, StringList,
        social_post::{self, GeneratedBy},
        social_post_queue::{self, QueueStatus},
    },
    errors::{Error, Result},
    integrations::{
        llm::{LanguageModel, complete_as},
        webhook::WebhookDispatcher,
    },
};
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category used when the request names none
pub const DEFAULT_CATEGORY: &str = "general";

/// Trigger recorded when the request names none
pub const DEFAULT_TRIGGER: &str = "manual";

/// Maximum post length, in characters, including hashtags.
#[must_use]
pub fn platform_char_limit(platform: &str) -> usize {
    match platform {
        "twitter" | "x" => 280,
        "instagram" => 2_200,
        "linkedin" => 3_000,
        "facebook" => 63_206,
        _ => 2_000,
    }
}

/// Body of `POST /functions/generate-social-content`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentRequest {
    /// Company the posts are for
    pub company_id: i64,
    /// Content theme, e.g. "project_milestone"
    #[serde(default)]
    pub template_category: Option<String>,
    /// Where to POST the generated posts
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// What started the run, e.g. "manual" or "project_completed"
    #[serde(default)]
    pub trigger_type: Option<String>,
    /// Queue row tracking this run
    #[serde(default)]
    pub queue_id: Option<i64>,
}

/// Text and hashtags for one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    /// Target platform
    pub platform: String,
    /// Post body
    pub content: String,
    /// Hashtags without the leading `#`
    pub hashtags: Vec<String>,
    /// Model or template
    pub generated_by: GeneratedBy,
}

impl GeneratedPost {
    /// Length of the post as published, hashtags included.
    #[must_use]
    pub fn published_len(&self) -> usize {
        let tags: usize = self.hashtags.iter().map(|t| t.chars().count() + 2).sum();
        self.content.chars().count() + tags
    }
}

/// The JSON shape requested from the model
#[derive(Debug, Clone, Deserialize)]
struct ModelPost {
    content: String,
    #[serde(default)]
    hashtags: Vec<String>,
}

fn normalize_hashtags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().trim_start_matches('#').replace(' ', ""))
        .filter(|t| !t.is_empty())
        .collect()
}

/// The deterministic post used when the model cannot provide one.
#[must_use]
pub fn fallback_post(company_name: &str, category: &str, platform: &str) -> GeneratedPost {
    let (body, hashtags): (&str, &[&str]) = match category {
        "project_milestone" => (
            "Another milestone reached! The {{company}} team keeps building with quality and safety first.",
            &["construction", "milestone", "teamwork"],
        ),
        "project_completed" => (
            "Project complete! {{company}} is proud to hand over another build to a happy client.",
            &["construction", "projectcomplete", "builtright"],
        ),
        "safety" => (
            "Safety is never optional. Every day on a {{company}} site starts with a safety briefing.",
            &["safetyfirst", "construction"],
        ),
        "hiring" => (
            "{{company}} is growing! We are looking for skilled trades to join our crews.",
            &["hiring", "constructionjobs"],
        ),
        _ => (
            "From groundbreaking to handover, {{company}} builds with care. Follow along for updates from our sites.",
            &["construction", "building"],
        ),
    };

    let mut values = BTreeMap::new();
    values.insert("company".to_string(), company_name.to_string());
    let mut content = render(body, &values);
    if platform == "linkedin" {
        content.push_str(" Connect with us to learn more about our work.");
    }

    GeneratedPost {
        platform: platform.to_string(),
        content,
        hashtags: hashtags.iter().map(|t| (*t).to_string()).collect(),
        generated_by: GeneratedBy::Template,
    }
}

fn system_prompt(platform: &str) -> String {
    format!(
        "You write social media posts for construction companies. Reply with a JSON object \
         {{\"content\": string, \"hashtags\": [string]}}. The post is for {platform} and must \
         stay under {} characters including hashtags.",
        platform_char_limit(platform)
    )
}

async fn post_from_model(
    llm: &dyn LanguageModel,
    company_name: &str,
    category: &str,
    platform: &str,
) -> Result<GeneratedPost> {
    let prompt = format!(
        "Company: {company_name}\nTheme: {}\nWrite one {platform} post.",
        category.replace('_', " ")
    );
    let reply: ModelPost = complete_as(llm, &system_prompt(platform), &prompt).await?;

    let post = GeneratedPost {
        platform: platform.to_string(),
        content: reply.content.trim().to_string(),
        hashtags: normalize_hashtags(reply.hashtags),
        generated_by: GeneratedBy::Ai,
    };
    if post.content.is_empty() {
        return Err(Error::Upstream {
            message: "Model returned an empty post".to_string(),
        });
    }
    let limit = platform_char_limit(platform);
    if post.published_len() > limit {
        return Err(Error::Upstream {
            message: format!("Post is {} characters, {platform} allows {limit}", post.published_len()),
        });
    }
    Ok(post)
}

/// Generates a post for one platform, falling back to the template on any model failure.
pub async fn generate_post(
    llm: &dyn LanguageModel,
    company_name: &str,
    category: &str,
    platform: &str,
) -> GeneratedPost {
    match post_from_model(llm, company_name, category, platform).await {
        Ok(post) => post,
        Err(e) => {
            tracing::warn!(platform, error = %e, "Using template post");
            fallback_post(company_name, category, platform)
        }
    }
}

/// Payload POSTed to the request's webhook
#[derive(Debug, Clone, Serialize)]
pub struct ContentWebhookPayload<'a> {
    /// Company the posts are for
    pub company_id: i64,
    /// What started the run
    pub trigger_type: &'a str,
    /// RFC 3339 generation time
    pub generated_at: String,
    /// Posts created by the run
    pub posts: &'a [social_post::Model],
}

/// Response of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Always true; failures are reported as errors
    pub success: bool,
    /// Platforms a post was generated for
    pub platforms_processed: usize,
    /// Rows written
    pub social_posts_created: usize,
    /// Whether the webhook answered 2xx
    pub webhook_sent: bool,
    /// The stored posts
    pub posts: Vec<social_post::Model>,
}

/// Creates a pending queue row for a later generation run.
pub async fn enqueue_generation(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    trigger_type: &str,
) -> Result<social_post_queue::Model> {
    let trigger_type = validate::require_text("Trigger type", trigger_type)?;
    social_post_queue::ActiveModel {
        company_id: Set(ctx.company_id),
        status: Set(QueueStatus::Pending),
        trigger_type: Set(trigger_type),
        posts_created: Set(0),
        error: Set(None),
        created_at: Set(Utc::now()),
        processed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn get_queue_entry(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    queue_id: i64,
) -> Result<social_post_queue::Model> {
    SocialPostQueue::find_by_id(queue_id)
        .filter(social_post_queue::Column::CompanyId.eq(ctx.company_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("queue entry", queue_id))
}

async fn set_queue_status(
    db: &DatabaseConnection,
    entry: social_post_queue::Model,
    status: QueueStatus,
    posts_created: i32,
    error: Option<String>,
) -> Result<social_post_queue::Model> {
    let mut active: social_post_queue::ActiveModel = entry.into();
    active.status = Set(status);
    active.posts_created = Set(posts_created);
    active.error = Set(error);
    if matches!(status, QueueStatus::Completed | QueueStatus::Failed) {
        active.processed_at = Set(Some(Utc::now()));
    }
    active.update(db).await.map_err(Into::into)
}

/// Inserts a run's posts together; either every platform's post is stored or none is.
async fn store_posts(
    db: &DatabaseConnection,
    ctx: &TenantContext,
    posts: Vec<GeneratedPost>,
    category: &str,
    trigger_type: &str,
    now: DateTime<Utc>,
) -> Result<Vec<social_post::Model>> {
    let txn = db.begin().await?;
    let mut stored = Vec::with_capacity(posts.len());
    for post in posts {
        let row = social_post::ActiveModel {
            company_id: Set(ctx.company_id),
            platform: Set(post.platform),
            content: Set(post.content),
            hashtags: Set(StringList(post.hashtags)),
            status: Set("draft".to_string()),
            trigger_type: Set(trigger_type.to_string()),
            template_category: Set(category.to_string()),
            generated_by: Set(post.generated_by),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        stored.push(row);
    }
    txn.commit().await?;
    Ok(stored)
}

/// Runs one generation request end to end.
///
/// An unknown company or queue entry is [`Error::NotFound`]. A webhook that
/// fails is logged and reported through `webhook_sent`; it never fails the run.
#[tracing::instrument(skip(db, llm, webhooks, platforms, request), fields(company_id = request.company_id))]
pub async fn generate_social_content(
    db: &DatabaseConnection,
    llm: &dyn LanguageModel,
    webhooks: &WebhookDispatcher,
    platforms: &[String],
    request: GenerateContentRequest,
) -> Result<GenerationReport> {
    let webhook_url = request
        .webhook_url
        .as_deref()
        .map(validate::require_http_url)
        .transpose()?;
    let company = company::get_company(db, request.company_id).await?;
    let ctx = TenantContext::system(company.id);

    let category = request
        .template_category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();
    let trigger_type = request
        .trigger_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TRIGGER)
        .to_string();

    let queue_entry = match request.queue_id {
        Some(queue_id) => {
            let entry = get_queue_entry(db, &ctx, queue_id).await?;
            Some(set_queue_status(db, entry, QueueStatus::Processing, 0, None).await?)
        }
        None => None,
    };

    let mut generated = Vec::with_capacity(platforms.len());
    for platform in platforms {
        generated.push(generate_post(llm, &company.name, &category, platform).await);
    }

    let now = Utc::now();
    let posts = match store_posts(db, &ctx, generated, &category, &trigger_type, now).await {
        Ok(posts) => posts,
        Err(e) => {
            if let Some(entry) = queue_entry {
                if let Err(mark_err) =
                    set_queue_status(db, entry, QueueStatus::Failed, 0, Some(e.to_string())).await
                {
                    tracing::error!(error = %mark_err, "Failed to mark queue entry failed");
                }
            }
            return Err(e);
        }
    };

    if let Some(entry) = queue_entry {
        let created = i32::try_from(posts.len())?;
        set_queue_status(db, entry, QueueStatus::Completed, created, None).await?;
    }

    let webhook_sent = match &webhook_url {
        Some(url) => {
            let payload = ContentWebhookPayload {
                company_id: company.id,
                trigger_type: &trigger_type,
                generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
                posts: &posts,
            };
            webhooks.dispatch(url, &payload).await
        }
        None => false,
    };

    audit::record(
        db,
        &ctx,
        "social_content.generate",
        "social_post",
        None,
        Some(format!("{} posts, trigger {trigger_type}", posts.len())),
    )
    .await?;
    tracing::info!(posts = posts.len(), webhook_sent, "Social content generated");

    Ok(GenerationReport {
        success: true,
        platforms_processed: platforms.len(),
        social_posts_created: posts.len(),
        webhook_sent,
        posts,
    })
}

/// The caller's posts, newest first.
pub async fn list_social_posts(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<social_post::Model>> {
    SocialPost::find()
        .filter(social_post::Column::CompanyId.eq(ctx.company_id))
        .order_by_desc(social_post::Column::CreatedAt)
        .order_by_desc(social_post::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The caller's queue rows, newest first.
pub async fn list_queue(
    db: &DatabaseConnection,
    ctx: &TenantContext,
) -> Result<Vec<social_post_queue::Model>> {
    SocialPostQueue::find()
        .filter(social_post_queue::Column::CompanyId.eq(ctx.company_id))
        .order_by_desc(social_post_queue::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use axum::{Json, Router, routing::post};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn platforms() -> Vec<String> {
        ["linkedin", "facebook", "twitter", "instagram"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn request(company_id: i64) -> GenerateContentRequest {
        GenerateContentRequest {
            company_id,
            template_category: Some("project_milestone".to_string()),
            webhook_url: None,
            trigger_type: None,
            queue_id: None,
        }
    }

    #[test]
    fn test_fallback_is_deterministic_and_fits() {
        for platform in platforms() {
            let a = fallback_post("Northwind Builders", "safety", &platform);
            let b = fallback_post("Northwind Builders", "safety", &platform);
            assert_eq!(a, b);
            assert!(a.content.contains("Northwind Builders"));
            assert!(a.published_len() <= platform_char_limit(&platform));
            assert_eq!(a.generated_by, GeneratedBy::Template);
        }
        let general = fallback_post("Acme", "unknown-category", "twitter");
        assert!(general.content.starts_with("From groundbreaking"));
    }

    #[test]
    fn test_normalize_hashtags() {
        let tags = vec!["#Build".to_string(), " safety first ".to_string(), "#".to_string()];
        assert_eq!(normalize_hashtags(tags), vec!["Build", "safetyfirst"]);
    }

    #[tokio::test]
    async fn test_model_posts_are_used_when_valid() {
        let llm = CannedModel::replying(json!({ "content": "Slab poured on level 3.", "hashtags": ["#concrete"] }));
        let post = generate_post(&llm, "Acme", "project_milestone", "twitter").await;
        assert_eq!(post.generated_by, GeneratedBy::Ai);
        assert_eq!(post.hashtags, vec!["concrete"]);
    }

    #[tokio::test]
    async fn test_overlong_or_failed_replies_fall_back() {
        let long = "x".repeat(300);
        let llm = CannedModel::replying(json!({ "content": long, "hashtags": [] }));
        let post = generate_post(&llm, "Acme", "safety", "twitter").await;
        assert_eq!(post.generated_by, GeneratedBy::Template);

        let post = generate_post(&CannedModel::failing(), "Acme", "safety", "linkedin").await;
        assert_eq!(post, fallback_post("Acme", "safety", "linkedin"));
    }

    #[tokio::test]
    async fn test_generation_run_with_queue_and_webhook() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::system(company.id);
        let queued = enqueue_generation(&db, &ctx, "project_completed").await?;

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let router = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| async move {
                sink.lock().unwrap().push(body);
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, router).await });

        let mut req = request(company.id);
        req.webhook_url = Some(format!("http://{addr}/hook"));
        req.queue_id = Some(queued.id);
        req.trigger_type = Some("project_completed".to_string());

        let dispatcher = WebhookDispatcher::new()?;
        let report =
            generate_social_content(&db, &CannedModel::failing(), &dispatcher, &platforms(), req)
                .await?;
        assert!(report.success);
        assert_eq!(report.platforms_processed, 4);
        assert_eq!(report.social_posts_created, 4);
        assert!(report.webhook_sent);

        let payloads = received.lock().unwrap().clone();
        assert_eq!(payloads[0]["company_id"], company.id);
        assert_eq!(payloads[0]["trigger_type"], "project_completed");
        assert_eq!(payloads[0]["posts"].as_array().unwrap().len(), 4);

        let queue = list_queue(&db, &ctx).await?;
        assert_eq!(queue[0].status, QueueStatus::Completed);
        assert_eq!(queue[0].posts_created, 4);
        assert!(queue[0].processed_at.is_some());

        assert_eq!(list_social_posts(&db, &ctx).await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_fail_run() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let mut req = request(company.id);
        req.webhook_url = Some("http://127.0.0.1:9/hook".to_string());

        let dispatcher = WebhookDispatcher::with_timeout(std::time::Duration::from_secs(1))?;
        let report =
            generate_social_content(&db, &CannedModel::failing(), &dispatcher, &platforms(), req)
                .await?;
        assert!(!report.webhook_sent);
        assert_eq!(report.social_posts_created, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_insert_stores_no_posts_and_fails_queue() -> Result<()> {
        let (db, company) = setup_with_company().await?;
        let ctx = TenantContext::system(company.id);
        db.execute_unprepared(
            "CREATE TRIGGER reject_instagram BEFORE INSERT ON social_posts \
             WHEN NEW.platform = 'instagram' BEGIN SELECT RAISE(ABORT, 'instagram rejected'); END",
        )
        .await?;
        let queued = enqueue_generation(&db, &ctx, "manual").await?;

        let mut req = request(company.id);
        req.queue_id = Some(queued.id);
        let dispatcher = WebhookDispatcher::new()?;
        let result =
            generate_social_content(&db, &CannedModel::failing(), &dispatcher, &platforms(), req)
                .await;
        assert!(result.is_err());

        assert!(list_social_posts(&db, &ctx).await?.is_empty());
        let queue = list_queue(&db, &ctx).await?;
        assert_eq!(queue[0].status, QueueStatus::Failed);
        assert_eq!(queue[0].posts_created, 0);
        assert!(queue[0].error.as_deref().unwrap().contains("instagram rejected"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_company_and_bad_url() -> Result<()> {
        let db = setup_test_db().await?;
        let dispatcher = WebhookDispatcher::new()?;
        let llm = CannedModel::failing();

        let result = generate_social_content(&db, &llm, &dispatcher, &platforms(), request(404)).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let mut req = request(1);
        req.webhook_url = Some("ftp://example.com".to_string());
        let result = generate_social_content(&db, &llm, &dispatcher, &platforms(), req).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
