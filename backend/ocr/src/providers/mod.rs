pub mod huggingface;
pub mod ocr_space;
pub mod ollama;
pub mod tesseract;

pub use huggingface::HuggingFaceOcrProvider;
pub use ocr_space::OcrSpaceProvider;
pub use ollama::OllamaVisionProvider;
pub use tesseract::TesseractProvider;

use snapsolve_core::OcrProviderError;

/// Turn a non-2xx response into an upstream error carrying the body text.
pub(crate) async fn upstream_error(provider: &str, response: reqwest::Response) -> OcrProviderError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    OcrProviderError::Upstream {
        provider: provider.to_string(),
        status,
        message,
    }
}
