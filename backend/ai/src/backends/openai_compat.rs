use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use snapsolve_core::{AiBackend, AiConfig, AiError, ProviderKind};

use super::chat::{self, ChatCall};
use super::{base_url, require_key};
use crate::http::RetryPolicy;
use crate::prompts::PromptPair;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Any server speaking the OpenAI chat completions protocol.
/// `endpointUrl` points at the API root, e.g. `https://api.openai.com/v1`.
pub struct OpenAiCompatibleBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiCompatibleBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
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

impl Default for OpenAiCompatibleBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiBackend for OpenAiCompatibleBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatible
    }

    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError> {
        let api_key = require_key(self.kind(), config)?;
        let model = self.resolve_model(config).await;
        let base = base_url(config, &self.base_url);
        debug!(model = %model, endpoint = %base, "Sending request to OpenAI-compatible endpoint");

        let call = ChatCall {
            provider: self.kind(),
            base_url: base,
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
