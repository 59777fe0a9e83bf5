use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use snapsolve_core::{CapturedImage, OcrProvider, OcrProviderError, OcrResult};

use super::upstream_error;

const NAME: &str = "ollama";

const EXTRACTION_PROMPT: &str =
    "Extract all text from this image exactly as written. Return only the extracted text, nothing else.";

/// Local Ollama vision model (llava and friends).
pub struct OllamaVisionProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaVisionProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl OcrProvider for OllamaVisionProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        match self.client.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn try_extract(&self, image: &CapturedImage) -> Result<OcrResult, OcrProviderError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: EXTRACTION_PROMPT,
            images: vec![image.to_base64()],
            stream: false,
        };
        debug!(model = %self.model, "Sending image to Ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| OcrProviderError::transport(NAME, e.to_string()))?;
        if !response.status().is_success() {
            return Err(upstream_error(NAME, response).await);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OcrProviderError::processing(NAME, format!("unexpected response: {e}")))?;
        Ok(OcrResult::text(NAME, generated.response))
    }
}
