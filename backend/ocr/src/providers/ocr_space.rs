use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use snapsolve_core::{CapturedImage, OcrProvider, OcrProviderError, OcrResult};

use super::upstream_error;
use crate::data_url::is_valid_image_data_url;

const NAME: &str = "ocr_space";

/// Public demo key accepted by the free OCR.space tier.
pub const OCR_SPACE_DEMO_KEY: &str = "helloworld";

/// Hosted OCR.space service. Free tier, no account needed with the demo key.
pub struct OcrSpaceProvider {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl OcrSpaceProvider {
    pub fn new(api_key: Option<String>, language: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.ocr.space/parse/image".to_string(),
            api_key: api_key
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| OCR_SPACE_DEMO_KEY.to_string()),
            language: language.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

/// `ErrorMessage` is either a string or a list of strings.
fn describe_error(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => "processing failed".to_string(),
    }
}

#[async_trait]
impl OcrProvider for OcrSpaceProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn try_extract(&self, image: &CapturedImage) -> Result<OcrResult, OcrProviderError> {
        let data_url = image.to_data_url();
        if !is_valid_image_data_url(&data_url) {
            return Err(OcrProviderError::processing(NAME, "image is not a valid data URL"));
        }

        let form = [
            ("apikey", self.api_key.as_str()),
            ("base64Image", data_url.as_str()),
            ("language", self.language.as_str()),
            ("isOverlayRequired", "false"),
        ];
        debug!(language = %self.language, "Sending image to OCR.space");

        let response = self
            .client
            .post(&self.base_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OcrProviderError::transport(NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(NAME, response).await);
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|e| OcrProviderError::processing(NAME, format!("unexpected response: {e}")))?;

        if parsed.is_errored_on_processing {
            return Err(OcrProviderError::processing(NAME, describe_error(parsed.error_message)));
        }

        let text = parsed
            .parsed_results
            .into_iter()
            .map(|r| r.parsed_text)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(OcrResult::text(NAME, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::{routing::post, Form, Json, Router};
    use snapsolve_core::ImageEncoding;
    use std::collections::HashMap;

    fn image() -> CapturedImage {
        CapturedImage::new(vec![0x89, b'P', b'N', b'G'], ImageEncoding::Png, 20, 20)
    }

    #[tokio::test]
    async fn test_extracts_parsed_text() {
        let app = Router::new().route(
            "/parse/image",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                assert_eq!(form["apikey"], OCR_SPACE_DEMO_KEY);
                assert_eq!(form["language"], "eng");
                assert!(form["base64Image"].starts_with("data:image/png;base64,"));
                Json(serde_json::json!({
                    "ParsedResults": [{"ParsedText": "What is the capital\r\nof France?"}],
                    "OCRExitCode": 1,
                    "IsErroredOnProcessing": false
                }))
            }),
        );
        let base = test_server::spawn(app).await;
        let provider = OcrSpaceProvider::new(None, "eng").with_base_url(format!("{base}/parse/image"));

        let result = provider.try_extract(&image()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.source.as_deref(), Some("ocr_space"));
        assert!(result.extracted_text.unwrap().contains("capital"));
    }

    #[tokio::test]
    async fn test_processing_error_is_reported() {
        let app = Router::new().route(
            "/parse/image",
            post(|| async {
                Json(serde_json::json!({
                    "IsErroredOnProcessing": true,
                    "ErrorMessage": ["Unable to recognize the file type", "E216"]
                }))
            }),
        );
        let base = test_server::spawn(app).await;
        let provider = OcrSpaceProvider::new(Some("k".into()), "eng").with_base_url(format!("{base}/parse/image"));

        let err = provider.try_extract(&image()).await.unwrap_err();
        assert_eq!(
            err,
            OcrProviderError::processing("ocr_space", "Unable to recognize the file type; E216")
        );
    }

    #[tokio::test]
    async fn test_http_failure_is_upstream_error() {
        let app = Router::new().route(
            "/parse/image",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let base = test_server::spawn(app).await;
        let provider = OcrSpaceProvider::new(None, "eng").with_base_url(format!("{base}/parse/image"));

        match provider.try_extract(&image()).await.unwrap_err() {
            OcrProviderError::Upstream { status, message, .. } => {
                assert_eq!(status, 503);
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_blank_key_falls_back_to_demo_key() {
        let provider = OcrSpaceProvider::new(Some("  ".into()), "eng");
        assert_eq!(provider.api_key, OCR_SPACE_DEMO_KEY);
    }
}
