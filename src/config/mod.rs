/// Application settings loaded from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Idempotent seeding of companies and the AI model catalogue
pub mod seed;

pub use app::{AppConfig, load_app_configuration};
