use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use snapsolve_core::{AiBackend, AiConfig, AiError, ProviderKind};

use super::{base_url, require_key};
use crate::discovery::{pick_gemini_model, GeminiModel, GeminiModelList};
use crate::http::{fetch_json, send_json, RetryPolicy};
use crate::prompts::PromptPair;

/// Used when discovery fails or lists no gemini model.
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";

/// Google Generative Language API.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
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

    async fn fetch_models(&self, config: &AiConfig) -> Result<Vec<GeminiModel>, AiError> {
        let api_key = require_key(self.kind(), config)?;
        let url = format!("{}/v1/models", base_url(config, &self.base_url));
        let list: GeminiModelList =
            fetch_json(self.kind(), self.client.get(url).query(&[("key", api_key)])).await?;
        Ok(list.models)
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Model ids in request paths carry the `models/` prefix.
fn qualified(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

#[async_trait]
impl AiBackend for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let api_key = require_key(self.kind(), config)?;
        let model = self.resolve_model(config).await;
        let prompts = PromptPair::for_config(text, config);

        // No system role here: both prompts go in one user turn.
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompts.combined() }] }],
            "generationConfig": {
                "temperature": config.temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": config.max_tokens,
            }
        });
        let url = format!("{}/v1/{}:generateContent", base_url(config, &self.base_url), model);
        debug!(model = %model, "Sending request to Gemini");

        let response: GenerateResponse = send_json(&self.retry, self.kind(), || {
            self.client.post(&url).query(&[("key", api_key)]).json(&body)
        })
        .await
        .map_err(|e| {
            if let AiError::Upstream { status: 404, .. } = &e {
                warn!(model = %model, "Gemini model not found; the default may be stale");
            }
            e
        })?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AiError::protocol(self.kind(), "response has no candidates[0].content.parts[0].text"))
    }

    async fn list_models(&self, config: &AiConfig) -> Result<Vec<String>, AiError> {
        Ok(self.fetch_models(config).await?.into_iter().map(|m| m.name).collect())
    }

    async fn resolve_model(&self, config: &AiConfig) -> String {
        if let Some(model) = config.model.as_deref().filter(|m| !m.trim().is_empty()) {
            return qualified(model.trim());
        }
        match self.fetch_models(config).await {
            Ok(models) => match pick_gemini_model(&models) {
                Some(model) => {
                    info!(model = %model, "Discovered Gemini model");
                    model
                }
                None => {
                    warn!(listed = models.len(), default = DEFAULT_MODEL, "No usable Gemini model listed, using default");
                    DEFAULT_MODEL.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, default = DEFAULT_MODEL, "Gemini model discovery failed, using default");
                DEFAULT_MODEL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> AiConfig {
        AiConfig::new(ProviderKind::Gemini).with_api_key("AIza-test")
    }

    fn answer(text: &str) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
        }))
    }

    #[tokio::test]
    async fn test_discovers_model_then_generates() {
        let app = Router::new()
            .route(
                "/v1/models",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q["key"], "AIza-test");
                    Json(serde_json::json!({"models": [
                        {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]},
                        {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"]}
                    ]}))
                }),
            )
            .route(
                "/v1/models/:call",
                post(|Path(call): Path<String>, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(call, "gemini-1.5-pro:generateContent");
                    assert_eq!(body["generationConfig"]["topK"], 40);
                    assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
                    answer("Paris")
                }),
            );
        let base = test_server::spawn(app).await;
        let backend = GeminiBackend::new().with_base_url(base);

        assert_eq!(
            backend.call("What is the capital of France?", &config()).await.unwrap(),
            "Paris"
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_falls_back_to_default() {
        let app = Router::new()
            .route("/v1/models", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/v1/models/:call",
                post(|Path(call): Path<String>| async move {
                    assert_eq!(call, "gemini-1.5-flash:generateContent");
                    answer("ok")
                }),
            );
        let base = test_server::spawn(app).await;
        let backend = GeminiBackend::new().with_base_url(base);

        assert_eq!(backend.resolve_model(&config()).await, DEFAULT_MODEL);
        assert_eq!(backend.call("q", &config()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_explicit_model_skips_discovery() {
        let app = Router::new().route(
            "/v1/models/:call",
            post(|Path(call): Path<String>| async move {
                assert_eq!(call, "gemini-pro:generateContent");
                answer("ok")
            }),
        );
        let base = test_server::spawn(app).await;
        let backend = GeminiBackend::new().with_base_url(base);
        assert_eq!(backend.call("q", &config().with_model("gemini-pro")).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_rate_limited_three_times_then_answers() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/models/:call",
            post(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        StatusCode::TOO_MANY_REQUESTS.into_response()
                    } else {
                        answer("4").into_response()
                    }
                }
            }),
        );
        let base = test_server::spawn(app).await;
        let backend = GeminiBackend::new()
            .with_base_url(base)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));

        let answer = backend.call("2+2=?", &config().with_model("gemini-pro")).await.unwrap();
        assert_eq!(answer, "4");
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_is_rate_limit_error() {
        let app = Router::new().route(
            "/v1/models/:call",
            post(|| async { StatusCode::TOO_MANY_REQUESTS }),
        );
        let base = test_server::spawn(app).await;
        let backend = GeminiBackend::new()
            .with_base_url(base)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        let err = backend.call("q", &config().with_model("gemini-pro")).await.unwrap_err();
        assert_eq!(
            err,
            AiError::RateLimit {
                provider: ProviderKind::Gemini,
                attempts: 4
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_names_credential() {
        let app = Router::new().route(
            "/v1/models/:call",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = test_server::spawn(app).await;
        let err = GeminiBackend::new()
            .with_base_url(base)
            .call("q", &config().with_model("gemini-pro"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Google API key"));
        assert_eq!(err.kind(), snapsolve_core::ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_protocol_error() {
        let app = Router::new().route(
            "/v1/models/:call",
            post(|| async { Json(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]})) }),
        );
        let base = test_server::spawn(app).await;
        let err = GeminiBackend::new()
            .with_base_url(base)
            .call("q", &config().with_model("gemini-pro"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Protocol { .. }));
    }
}
