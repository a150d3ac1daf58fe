//! Language model access.
//!
//! Callers depend on the [`LanguageModel`] trait and always ask for a JSON
//! object, which they then deserialize into a typed response with
//! [`complete_as`]. Any transport, status or shape problem surfaces as
//! [`Error::Upstream`].

use crate::{
    config::app::LlmConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

/// A chat model that answers with a single JSON object.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name reported back in stored results
    fn model_name(&self) -> &str;

    /// Sends a system and user prompt and returns the parsed JSON reply.
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<serde_json::Value>;
}

/// Asks `llm` for JSON and deserializes it into `T`.
pub async fn complete_as<T>(llm: &dyn LanguageModel, system: &str, prompt: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let value = llm.complete_json(system, prompt).await?;
    serde_json::from_value(value).map_err(|e| Error::Upstream {
        message: format!("Model reply did not match the expected shape: {e}"),
    })
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiCompatibleClient {
    /// Builds a client. Without an API key every call fails with
    /// [`Error::Upstream`], so callers fall back or report the outage.
    pub fn new(api_key: Option<String>, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

/// Removes a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, system: &str, prompt: &str) -> Result<serde_json::Value> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::Upstream {
                message: "No language model API key configured".to_string(),
            });
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, prompt_length = prompt.len(), "Calling language model");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Language model unreachable");
                Error::Upstream {
                    message: format!("Language model request failed: {e}"),
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Language model request failed");
            return Err(Error::Upstream {
                message: format!("Language model returned {status}"),
            });
        }

        let chat: ChatResponse = resp.json().await.map_err(|e| Error::Upstream {
            message: format!("Language model returned an unreadable body: {e}"),
        })?;
        if let Some(usage) = &chat.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Language model response received"
            );
        }

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Upstream {
                message: "Language model returned no choices".to_string(),
            })?;

        serde_json::from_str(strip_code_fence(&content)).map_err(|e| Error::Upstream {
            message: format!("Language model reply is not JSON: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            model: "test-model".to_string(),
            timeout_secs: 5,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[tokio::test]
    async fn test_complete_json_against_local_server() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer secret");
                assert_eq!(body["response_format"]["type"], "json_object");
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "{\"ok\": true}" } }],
                    "usage": { "prompt_tokens": 3, "completion_tokens": 2 }
                }))
            }),
        );
        let base = serve(router).await;

        let client = OpenAiCompatibleClient::new(Some("secret".to_string()), &config(base)).unwrap();
        let value = client.complete_json("system", "prompt").await.unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_error_status_and_missing_key_are_upstream_errors() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let base = serve(router).await;

        let client = OpenAiCompatibleClient::new(Some("secret".to_string()), &config(base.clone())).unwrap();
        assert!(matches!(
            client.complete_json("s", "p").await,
            Err(Error::Upstream { .. })
        ));

        let keyless = OpenAiCompatibleClient::new(None, &config(base)).unwrap();
        assert!(matches!(
            keyless.complete_json("s", "p").await,
            Err(Error::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_and_body_failures_are_upstream_errors() {
        let unreachable =
            OpenAiCompatibleClient::new(Some("secret".to_string()), &config("http://127.0.0.1:9".to_string()))
                .unwrap();
        assert!(matches!(
            unreachable.complete_json("s", "p").await,
            Err(Error::Upstream { .. })
        ));

        let router = Router::new().route("/chat/completions", post(|| async { "not json" }));
        let base = serve(router).await;
        let client = OpenAiCompatibleClient::new(Some("secret".to_string()), &config(base)).unwrap();
        assert!(matches!(
            client.complete_json("s", "p").await,
            Err(Error::Upstream { .. })
        ));
    }
}
