//! Outbound integrations: the language model API and user webhooks.

pub mod llm;
pub mod webhook;

pub use llm::{LanguageModel, OpenAiCompatibleClient};
pub use webhook::WebhookDispatcher;
