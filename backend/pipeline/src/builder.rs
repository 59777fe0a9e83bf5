//! Settings → runtime components.

use std::sync::Arc;

use snapsolve_ai::RetryPolicy;
use snapsolve_config::{OcrProviderKind, OcrSettings, RetrySettings};
use snapsolve_core::OcrProvider;
use snapsolve_ocr::{HuggingFaceOcrProvider, OcrChain, OcrSpaceProvider, OllamaVisionProvider, TesseractProvider};

pub const DEFAULT_HF_OCR_MODEL: &str = "microsoft/trocr-base-printed";
pub const DEFAULT_OLLAMA_VISION_MODEL: &str = "llava";

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// One provider per configured kind, in configured order.
pub fn build_ocr_providers(settings: &OcrSettings) -> Vec<Arc<dyn OcrProvider>> {
    let language = settings.language();

    settings
        .provider_kinds()
        .into_iter()
        .map(|kind| -> Arc<dyn OcrProvider> {
            match kind {
                OcrProviderKind::OcrSpace => {
                    let provider = OcrSpaceProvider::new(non_blank(&settings.ocr_space_api_key), language);
                    match non_blank(&settings.ocr_space_url) {
                        Some(url) => Arc::new(provider.with_base_url(url)),
                        None => Arc::new(provider),
                    }
                }
                OcrProviderKind::HuggingFace => {
                    let model = non_blank(&settings.hugging_face_model)
                        .unwrap_or_else(|| DEFAULT_HF_OCR_MODEL.to_string());
                    Arc::new(HuggingFaceOcrProvider::new(model, non_blank(&settings.hugging_face_token)))
                }
                OcrProviderKind::Ollama => {
                    let model = non_blank(&settings.ollama_model)
                        .unwrap_or_else(|| DEFAULT_OLLAMA_VISION_MODEL.to_string());
                    let provider = OllamaVisionProvider::new(model);
                    match non_blank(&settings.ollama_url) {
                        Some(url) => Arc::new(provider.with_base_url(url)),
                        None => Arc::new(provider),
                    }
                }
                OcrProviderKind::Tesseract => {
                    let provider = TesseractProvider::new(language);
                    match non_blank(&settings.tesseract_path) {
                        Some(path) => Arc::new(provider.with_binary(path)),
                        None => Arc::new(provider),
                    }
                }
            }
        })
        .collect()
}

pub fn build_ocr_chain(settings: &OcrSettings) -> OcrChain {
    OcrChain::new(build_ocr_providers(settings)).with_provider_timeout(settings.provider_timeout())
}

pub fn retry_policy(settings: &RetrySettings) -> RetryPolicy {
    RetryPolicy::new(settings.max_retries(), settings.base_delay())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_chain_order() {
        let chain = build_ocr_chain(&OcrSettings::default());
        let names: Vec<_> = chain.providers().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["ocr_space", "tesseract"]);
    }

    #[test]
    fn test_configured_order_is_kept_and_unknown_skipped() {
        let settings = OcrSettings {
            providers: Some(vec![
                "tesseract".into(),
                "magic".into(),
                "ollama".into(),
                "huggingface".into(),
            ]),
            ..Default::default()
        };
        let names: Vec<_> = build_ocr_providers(&settings)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["tesseract", "ollama", "huggingface"]);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let policy = retry_policy(&RetrySettings {
            max_retries: Some(2),
            base_delay_ms: Some(250),
        });
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    }
}
