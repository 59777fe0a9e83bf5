use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use snapsolve_core::{spawn_with_deadline, AiConfig, ProviderKind};

use crate::client::AiClient;

pub const CONNECTION_TEST_PROMPT: &str = "Please respond with exactly: \"Connection successful\"";

/// Outcome of a round trip to the configured AI backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub provider: ProviderKind,
    pub success: bool,
    pub model: String,
    pub message: String,
    pub latency_ms: u64,
}

/// Send a tiny fixed prompt through the normal call path.
///
/// Any answer counts as success; the exact phrase only changes the message.
pub async fn test_connection(client: &AiClient, config: &AiConfig, timeout: Duration) -> ConnectionReport {
    let started = Instant::now();
    let provider = config.provider;

    let model = match client.registry().get(provider) {
        Ok(backend) => backend.resolve_model(config).await,
        Err(e) => {
            return ConnectionReport {
                provider,
                success: false,
                model: String::new(),
                message: e.to_string(),
                latency_ms: 0,
            }
        }
    };

    let mut probe = config.clone();
    probe.model = Some(model.clone()).filter(|m| !m.is_empty());
    probe.system_prompt = Some("You are a helpful assistant.".to_string());
    probe.user_prompt_template = Some("{text}".to_string());
    probe.max_tokens = 10;
    probe.temperature = 0.0;

    let call_client = client.clone();
    let outcome = spawn_with_deadline(timeout, async move {
        call_client.get_ai_response(CONNECTION_TEST_PROMPT, &probe).await
    })
    .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (success, message) = match outcome {
        Ok(Ok(answer)) if answer.to_lowercase().contains("connection successful") => {
            (true, format!("{provider} connection successful"))
        }
        Ok(Ok(_)) => (true, format!("{provider} connection working")),
        Ok(Err(e)) => (false, e.to_string()),
        Err(e) => (false, format!("{provider}: {e}")),
    };
    info!(provider = %provider, success, latency_ms, "Connection test finished");

    ConnectionReport {
        provider,
        success,
        model,
        message,
        latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::OllamaBackend;
    use crate::registry::BackendRegistry;
    use crate::test_server;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_probe_uses_small_fixed_prompt() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["prompt"], CONNECTION_TEST_PROMPT);
                assert_eq!(body["options"]["num_predict"], 10);
                assert_eq!(body["options"]["temperature"], 0.0);
                Json(serde_json::json!({"response": "Connection successful"}))
            }),
        );
        let base = test_server::spawn(app).await;
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(OllamaBackend::new().with_base_url(base)));
        let client = AiClient::new(registry);

        let config = AiConfig::new(ProviderKind::Ollama).with_model("llama3");
        let report = test_connection(&client, &config, Duration::from_secs(5)).await;
        assert!(report.success, "{}", report.message);
        assert_eq!(report.model, "llama3");
        assert_eq!(report.message, "ollama connection successful");
    }

    #[tokio::test]
    async fn test_missing_key_reports_failure() {
        let client = AiClient::default();
        let report = test_connection(&client, &AiConfig::new(ProviderKind::Groq), Duration::from_secs(5)).await;
        assert!(!report.success);
        assert!(report.message.contains("Groq API key"));
    }
}
