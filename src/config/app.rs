//! Application configuration loading from config.toml
//!
//! Every section is optional. A missing file yields the built-in defaults,
//! unless the path was given explicitly through `SITEBOOK_CONFIG`. Secrets
//! such as the language model API key are never read from this file.

use crate::{
    core::ai_model::NewAiModel,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "SITEBOOK_CONFIG";

/// Config file used when `SITEBOOK_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Language model endpoint
    #[serde(default)]
    pub llm: LlmConfig,
    /// Social content generation
    #[serde(default)]
    pub content: ContentConfig,
    /// Installation-wide administration
    #[serde(default)]
    pub admin: AdminConfig,
    /// Companies created at startup when missing
    #[serde(default)]
    pub companies: Vec<CompanySeed>,
    /// AI catalogue rows created at startup when missing
    #[serde(default)]
    pub ai_models: Vec<AiModelSeed>,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// `[admin]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// User ids granted `platform:admin`, e.g. for the AI model catalogue
    #[serde(default)]
    pub platform_admins: Vec<String>,
}

impl AdminConfig {
    /// Whether `user_id` operates the whole installation.
    #[must_use]
    pub fn is_platform_admin(&self, user_id: &str) -> bool {
        self.platform_admins.iter().any(|admin| admin == user_id)
    }
}

/// `[llm]`
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model requested from the API
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Completion length cap
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_llm_timeout() -> u64 {
    60
}

/// `[content]`
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Platforms a generation run targets
    #[serde(default = "default_platforms")]
    pub default_platforms: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_platforms: default_platforms(),
        }
    }
}

fn default_platforms() -> Vec<String> {
    ["linkedin", "facebook", "twitter", "instagram"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// `[[companies]]`
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySeed {
    /// Unique company name
    pub name: String,
    /// Trade, e.g. "commercial"
    #[serde(default)]
    pub industry: Option<String>,
}

/// `[[ai_models]]`
#[derive(Debug, Clone, Deserialize)]
pub struct AiModelSeed {
    /// Catalogue row
    #[serde(flatten)]
    pub model: NewAiModel,
    /// Make this the provider default after seeding
    #[serde(default)]
    pub is_default: bool,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    tracing::debug!(?path, "Loading configuration");
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads the configuration the server runs with.
///
/// Reads `SITEBOOK_CONFIG` (default `./config.toml`) and applies the
/// `BIND_ADDR` override.
pub fn load_app_configuration() -> Result<AppConfig> {
    let explicit = std::env::var(CONFIG_PATH_VAR).ok();
    let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if explicit.is_none() && !Path::new(&path).exists() {
        tracing::info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
        AppConfig::default()
    } else {
        load_config(&path)?
    };

    if let Ok(bind_addr) = std::env::var("BIND_ADDR") {
        config.server.bind_addr = bind_addr;
    }

    tracing::info!(
        companies = config.companies.len(),
        ai_models = config.ai_models.len(),
        bind_addr = %config.server.bind_addr,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_addr = "127.0.0.1:3000"

            [llm]
            base_url = "http://localhost:11434/v1"
            model = "llama3"
            timeout_secs = 30
            temperature = 0.4

            [content]
            default_platforms = ["linkedin"]

            [admin]
            platform_admins = ["ops@sitebook"]

            [[companies]]
            name = "Northwind Builders"
            industry = "commercial"

            [[ai_models]]
            provider = "openai"
            model_name = "gpt-4o"
            quality_rating = 5
            speed_rating = 3
            cost_rating = 2
            priority_order = 1
            is_default = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.temperature, Some(0.4));
        assert_eq!(config.content.default_platforms, vec!["linkedin"]);
        assert!(config.admin.is_platform_admin("ops@sitebook"));
        assert!(!config.admin.is_platform_admin("site-manager"));
        assert_eq!(config.companies[0].name, "Northwind Builders");
        assert_eq!(config.ai_models[0].model.model_name, "gpt-4o");
        assert!(config.ai_models[0].is_default);
        assert!(!config.ai_models[0].model.is_alias);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(
            config.content.default_platforms,
            vec!["linkedin", "facebook", "twitter", "instagram"]
        );
        assert!(config.companies.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("sitebook-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[[companies]]\nname = \"Acme\"").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.companies.len(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_config_errors() {
        assert!(matches!(
            load_config("/nonexistent/sitebook.toml"),
            Err(Error::Config { .. })
        ));
        assert!(toml::from_str::<AppConfig>("[server]\nbind_addr = 5").is_err());
    }
}
