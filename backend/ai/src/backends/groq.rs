use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use snapsolve_core::{AiBackend, AiConfig, AiError, ProviderKind};

use super::chat::{self, ChatCall};
use super::{base_url, require_key};
use crate::http::RetryPolicy;
use crate::prompts::PromptPair;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Groq's OpenAI-compatible chat API.
pub struct GroqBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GroqBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
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

impl Default for GroqBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiBackend for GroqBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let api_key = require_key(self.kind(), config)?;
        let model = self.resolve_model(config).await;
        debug!(model = %model, "Sending request to Groq");

        let call = ChatCall {
            provider: self.kind(),
            base_url: base_url(config, &self.base_url),
            api_key,
            model: &model,
        };
        chat::complete(&self.client, &self.retry, call, &PromptPair::for_config(text, config), config).await
    }

    async fn list_models(&self, config: &AiConfig) -> Result<Vec<String>, AiError> {
        let api_key = require_key(self.kind(), config)?;
        chat::list_models(&self.client, self.kind(), base_url(config, &self.base_url), api_key).await
    }

    async fn resolve_model(&self, config: &AiConfig) -> String {
        config
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::http::{HeaderMap, StatusCode};
    use axum::{routing::post, Json, Router};
    use std::time::Duration;

    fn config() -> AiConfig {
        AiConfig::new(ProviderKind::Groq).with_api_key("gsk_test")
    }

    #[tokio::test]
    async fn test_reads_choice_content() {
        let app = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer gsk_test");
                assert_eq!(body["model"], DEFAULT_MODEL);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["max_tokens"], 500);
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "4"}}]
                }))
            }),
        );
        let base = test_server::spawn(app).await;
        let backend = GroqBackend::new().with_base_url(base);
        assert_eq!(backend.call("2+2=?", &config()).await.unwrap(), "4");
    }

    #[tokio::test]
    async fn test_blank_model_uses_default() {
        let backend = GroqBackend::new();
        assert_eq!(backend.resolve_model(&config().with_model("  ")).await, DEFAULT_MODEL);
        assert_eq!(backend.resolve_model(&config().with_model(" llama-3.3-70b ")).await, "llama-3.3-70b");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let backend = GroqBackend::new().with_base_url("http://127.0.0.1:1");
        let err = backend.call("2+2=?", &AiConfig::new(ProviderKind::Groq)).await.unwrap_err();
        match err {
            AiError::Auth { credential, .. } => assert_eq!(credential, "Groq API key"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forbidden_is_auth_error_without_retry() {
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = std::sync::Arc::clone(&hits);
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { (StatusCode::FORBIDDEN, Json(serde_json::json!({"error": {"message": "Invalid API Key"}}))) }
            }),
        );
        let base = test_server::spawn(app).await;
        let backend = GroqBackend::new()
            .with_base_url(base)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(5)));

        let err = backend.call("q", &config()).await.unwrap_err();
        assert!(matches!(err, AiError::Auth { .. }));
        assert!(err.to_string().contains("Invalid API Key"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_choices_is_protocol_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { Json(serde_json::json!({"id": "x", "choices": []})) }),
        );
        let base = test_server::spawn(app).await;
        let err = GroqBackend::new().with_base_url(base).call("q", &config()).await.unwrap_err();
        assert!(matches!(err, AiError::Protocol { .. }));
    }
}
