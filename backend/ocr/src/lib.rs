//! OCR fallback chain.
//!
//! Providers are tried strictly in configured order, each under its own
//! deadline. The first one to return at least two characters of text wins.
//! When every provider fails the user is asked, once, to type the question.
//!
//! ```rust,ignore
//! let chain = OcrChain::new(vec![
//!     Arc::new(OcrSpaceProvider::new(api_key, "eng")),
//!     Arc::new(TesseractProvider::new("eng")),
//! ]);
//! let outcome = chain.run_with_manual_fallback(&image, &manual).await;
//! ```

pub mod chain;
pub mod data_url;
pub mod providers;
pub mod text;

#[cfg(test)]
pub(crate) mod test_server;

pub use chain::{ChainOutcome, OcrAttempt, OcrChain, DEFAULT_PROVIDER_TIMEOUT, MANUAL_SOURCE};
pub use data_url::is_valid_image_data_url;
pub use providers::{HuggingFaceOcrProvider, OcrSpaceProvider, OllamaVisionProvider, TesseractProvider};
pub use text::clean_extracted_text;
