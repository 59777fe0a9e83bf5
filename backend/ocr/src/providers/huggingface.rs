use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use snapsolve_core::{CapturedImage, OcrProvider, OcrProviderError, OcrResult};

use super::upstream_error;

const NAME: &str = "huggingface";

/// Hugging Face hosted image-to-text model.
pub struct HuggingFaceOcrProvider {
    client: Client,
    base_url: String,
    model: String,
    token: Option<String>,
}

impl HuggingFaceOcrProvider {
    pub fn new(model: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api-inference.huggingface.co".to_string(),
            model: model.into(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

#[async_trait]
impl OcrProvider for HuggingFaceOcrProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn try_extract(&self, image: &CapturedImage) -> Result<OcrResult, OcrProviderError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        debug!(model = %self.model, "Sending image to Hugging Face");

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, image.encoding().mime_type())
            .body(image.bytes().to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OcrProviderError::transport(NAME, e.to_string()))?;
        if !response.status().is_success() {
            return Err(upstream_error(NAME, response).await);
        }

        let generations: Vec<Generation> = response
            .json()
            .await
            .map_err(|e| OcrProviderError::processing(NAME, format!("unexpected response: {e}")))?;
        let text = generations
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| OcrProviderError::processing(NAME, "model returned no generations"))?;
        Ok(OcrResult::text(NAME, text))
    }
}
