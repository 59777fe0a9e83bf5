use std::sync::Arc;

use tracing::{info, warn};

use snapsolve_core::{AiConfig, AiError};

use crate::prompts::validate_and_clean_text;
use crate::registry::BackendRegistry;

/// Entry point of the AI adapter: validates the text, picks the backend for
/// `config.provider` and returns the trimmed answer.
#[derive(Clone)]
pub struct AiClient {
    registry: Arc<BackendRegistry>,
}

impl AiClient {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub async fn get_ai_response(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let text = validate_and_clean_text(text)?;
        let backend = self.registry.get(config.provider)?;

        if config.provider.requires_api_key() && config.api_key().is_none() {
            return Err(AiError::Auth {
                provider: config.provider,
                credential: config.provider.credential_name().to_string(),
                detail: "not configured".to_string(),
            });
        }

        info!(provider = %config.provider, chars = text.chars().count(), "Requesting AI answer");
        let answer = backend.call(&text, config).await.map_err(|e| {
            warn!(provider = %config.provider, error = %e, "AI request failed");
            e
        })?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AiError::protocol(config.provider, "answer is empty"));
        }
        Ok(answer.to_string())
    }
}

impl Default for AiClient {
    fn default() -> Self {
        Self::new(BackendRegistry::default())
    }
}
