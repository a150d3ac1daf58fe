use sitebook::{
    api::{self, AppState},
    config::{self, database, seed},
    errors::{Error, Result},
    integrations::{OpenAiCompatibleClient, WebhookDispatcher},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Connect to the database and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed companies and the AI model catalogue (idempotent)
    seed::seed_companies(&db, &app_config.companies)
        .await
        .inspect(|n| info!("Seeded {} companies.", n))
        .inspect_err(|e| error!("Failed to seed companies: {}", e))?;
    seed::seed_ai_models(&db, &app_config.ai_models)
        .await
        .inspect(|n| info!("Seeded {} AI models.", n))
        .inspect_err(|e| error!("Failed to seed AI models: {}", e))?;

    // 6. Outbound clients
    // LLM_API_KEY is read here, directly before use, not stored in AppConfig
    let llm_key = env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty());
    if llm_key.is_none() {
        warn!("LLM_API_KEY not set; content generation will use templates and risk assessments will fail.");
    }
    let llm = OpenAiCompatibleClient::new(llm_key, &app_config.llm)?;
    let webhooks = WebhookDispatcher::new().map_err(Error::from)?;

    // 7. Serve
    let bind_addr = app_config.server.bind_addr.clone();
    let state = AppState {
        db: Arc::new(db),
        llm: Arc::new(llm),
        webhooks,
        config: Arc::new(app_config),
    };
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
