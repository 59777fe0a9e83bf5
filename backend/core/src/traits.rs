use async_trait::async_trait;

use crate::error::{AiError, OcrProviderError};
use crate::types::{AiConfig, CapturedImage, OcrResult, ProviderKind};

/// One link in the OCR fallback chain.
///
/// The chain only ever sees this trait, so providers can be added or removed
/// without touching the chain driver.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Short name used in logs and in `OcrResult::source`.
    fn name(&self) -> &str;

    /// Cheap reachability probe used by diagnostics. Not consulted by the chain.
    async fn is_available(&self) -> bool {
        true
    }

    /// Recognize the text in `image`.
    async fn try_extract(&self, image: &CapturedImage) -> Result<OcrResult, OcrProviderError>;
}

/// An LLM backend that answers a recognized question.
#[async_trait]
pub trait AiBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Send `text` with the call parameters in `config` and return the plain answer.
    async fn call(&self, text: &str, config: &AiConfig) -> Result<String, AiError>;

    /// Model identifiers the backend currently offers, if it has a listing endpoint.
    async fn list_models(&self, _config: &AiConfig) -> Result<Vec<String>, AiError> {
        Ok(Vec::new())
    }

    /// The model a call with `config` would use. Discovery failures degrade
    /// to the backend's default and never error.
    async fn resolve_model(&self, config: &AiConfig) -> String {
        config.model.clone().unwrap_or_default()
    }
}

/// Lets the user type the question when OCR recognized nothing.
#[async_trait]
pub trait ManualInput: Send + Sync {
    /// Ask once. `None` means the user dismissed the prompt.
    async fn request_text(&self, reason: &str) -> Option<String>;
}

/// Manual input for surfaces that cannot prompt; always declines.
pub struct DeclineManualInput;

#[async_trait]
impl ManualInput for DeclineManualInput {
    async fn request_text(&self, _reason: &str) -> Option<String> {
        None
    }
}
