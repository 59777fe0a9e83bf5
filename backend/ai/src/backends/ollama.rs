use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use snapsolve_core::{AiBackend, AiConfig, AiError, ProviderKind};

use super::base_url;
use crate::discovery::{pick_ollama_model, OllamaTags};
use crate::http::{fetch_json, send_json, RetryPolicy};
use crate::prompts::PromptPair;

pub const DEFAULT_MODEL: &str = "llama3";

/// Local Ollama server.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl AiBackend for OllamaBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let model = self.resolve_model(config).await;
        let prompts = PromptPair::for_config(text, config);
        let body = GenerateRequest {
            model: &model,
            system: &prompts.system,
            prompt: &prompts.user,
            stream: false,
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };
        let url = format!("{}/api/generate", base_url(config, &self.base_url));
        debug!(model = %model, "Sending request to Ollama");

        let response: GenerateResponse =
            send_json(&self.retry, self.kind(), || self.client.post(&url).json(&body)).await?;
        Ok(response.response)
    }

    async fn list_models(&self, config: &AiConfig) -> Result<Vec<String>, AiError> {
        let url = format!("{}/api/tags", base_url(config, &self.base_url));
        let tags: OllamaTags = fetch_json(self.kind(), self.client.get(url)).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn resolve_model(&self, config: &AiConfig) -> String {
        if let Some(model) = config.model.as_deref().filter(|m| !m.trim().is_empty()) {
            return model.trim().to_string();
        }
        match self.list_models(config).await {
            Ok(names) => match pick_ollama_model(&names) {
                Some(model) => {
                    info!(model = %model, "Discovered Ollama model");
                    model
                }
                None => {
                    warn!(installed = names.len(), default = DEFAULT_MODEL, "No llama model installed, using default");
                    DEFAULT_MODEL.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, default = DEFAULT_MODEL, "Ollama model discovery failed, using default");
                DEFAULT_MODEL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[tokio::test]
    async fn test_raw_response_with_discovered_model() {
        let app = Router::new()
            .route(
                "/api/tags",
                get(|| async {
                    Json(serde_json::json!({"models": [{"name": "mistral:7b"}, {"name": "llama3.1:8b"}]}))
                }),
            )
            .route(
                "/api/generate",
                post(|Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(body["model"], "llama3.1:8b");
                    assert_eq!(body["stream"], false);
                    assert_eq!(body["options"]["num_predict"], 500);
                    assert!(body["system"].as_str().unwrap().contains("same language"));
                    Json(serde_json::json!({"model": "llama3.1:8b", "response": "Paris", "done": true}))
                }),
            );
        let base = test_server::spawn(app).await;
        let backend = OllamaBackend::new().with_base_url(base);
        let answer = backend.call("What is the capital of France?", &AiConfig::new(ProviderKind::Ollama)).await;
        assert_eq!(answer.unwrap(), "Paris");
    }

    #[tokio::test]
    async fn test_unreachable_server_defaults_model_and_fails_transport() {
        let backend = OllamaBackend::new().with_base_url("http://127.0.0.1:1");
        let config = AiConfig::new(ProviderKind::Ollama);
        assert_eq!(backend.resolve_model(&config).await, DEFAULT_MODEL);
        assert!(matches!(
            backend.call("q", &config).await.unwrap_err(),
            AiError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_response_field_is_protocol_error() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { Json(serde_json::json!({"done": true})) }),
        );
        let base = test_server::spawn(app).await;
        let backend = OllamaBackend::new().with_base_url(base);
        let config = AiConfig::new(ProviderKind::Ollama).with_model("llama3");
        assert!(matches!(
            backend.call("q", &config).await.unwrap_err(),
            AiError::Protocol { .. }
        ));
    }
}
