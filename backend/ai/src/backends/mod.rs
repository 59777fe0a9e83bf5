pub mod chat;
pub mod gemini;
pub mod groq;
pub mod huggingface;
pub mod ollama;
pub mod openai_compat;

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use huggingface::HuggingFaceBackend;
pub use ollama::OllamaBackend;
pub use openai_compat::OpenAiCompatibleBackend;

use snapsolve_core::{AiConfig, AiError, ProviderKind};

/// The API key, or an auth error naming the missing credential.
pub(crate) fn require_key(provider: ProviderKind, config: &AiConfig) -> Result<&str, AiError> {
    config.api_key().ok_or_else(|| AiError::Auth {
        provider,
        credential: provider.credential_name().to_string(),
        detail: "not configured".to_string(),
    })
}

/// `endpointUrl` from settings when set, else the backend's base URL.
pub(crate) fn base_url<'a>(config: &'a AiConfig, fallback: &'a str) -> &'a str {
    config
        .endpoint_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(fallback)
        .trim_end_matches('/')
}
