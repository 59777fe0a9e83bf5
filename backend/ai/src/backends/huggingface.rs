use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use snapsolve_core::{AiBackend, AiConfig, AiError, ProviderKind};

use super::base_url;
use crate::http::{send_json, RetryPolicy};
use crate::prompts::PromptPair;

pub const DEFAULT_MODEL: &str = "HuggingFaceH4/zephyr-7b-beta";

/// Hugging Face serverless text-generation inference.
///
/// The token is optional; anonymous calls work at a lower rate limit.
pub struct HuggingFaceBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HuggingFaceBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api-inference.huggingface.co".to_string(),
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

impl Default for HuggingFaceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

#[async_trait]
impl AiBackend for HuggingFaceBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let model = self.resolve_model(config).await;
        let prompts = PromptPair::for_config(text, config);
        let body = serde_json::json!({
            "inputs": prompts.combined(),
            "parameters": {
                "max_new_tokens": config.max_tokens,
                "temperature": config.temperature,
                "return_full_text": false,
            }
        });
        let url = format!("{}/models/{}", base_url(config, &self.base_url), model);
        debug!(model = %model, "Sending request to Hugging Face");

        let generations: Vec<Generation> = send_json(&self.retry, self.kind(), || {
            let request = self.client.post(&url).json(&body);
            match config.api_key() {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await?;

        generations
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| AiError::protocol(self.kind(), "response has no [0].generated_text"))
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
    use axum::http::HeaderMap;
    use axum::{routing::post, Json, Router};

    #[tokio::test]
    async fn test_anonymous_generation() {
        let app = Router::new().route(
            "/models/HuggingFaceH4/zephyr-7b-beta",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert!(headers.get("authorization").is_none());
                assert_eq!(body["parameters"]["return_full_text"], false);
                assert!(body["inputs"].as_str().unwrap().contains("2+2=?"));
                Json(serde_json::json!([{"generated_text": "4"}]))
            }),
        );
        let base = test_server::spawn(app).await;
        let backend = HuggingFaceBackend::new().with_base_url(base);
        let answer = backend.call("2+2=?", &AiConfig::new(ProviderKind::HuggingFace)).await.unwrap();
        assert_eq!(answer, "4");
    }

    #[tokio::test]
    async fn test_blank_model_uses_default() {
        let config = AiConfig::new(ProviderKind::HuggingFace).with_model("");
        assert_eq!(HuggingFaceBackend::new().resolve_model(&config).await, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_object_instead_of_list_is_protocol_error() {
        let app = Router::new().route(
            "/models/m",
            post(|| async { Json(serde_json::json!({"generated_text": "4"})) }),
        );
        let base = test_server::spawn(app).await;
        let backend = HuggingFaceBackend::new().with_base_url(base);
        let config = AiConfig::new(ProviderKind::HuggingFace).with_model("m").with_api_key("hf_x");
        assert!(matches!(
            backend.call("q", &config).await.unwrap_err(),
            AiError::Protocol { .. }
        ));
    }
}
