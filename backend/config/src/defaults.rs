//! Settings defaults, applied to a freshly parsed file.

use snapsolve_core::{ProviderKind, MIN_SELECTION_PX};

use crate::schema::{
    AiSettings, AppSettings, LoggingSettings, OcrProviderKind, OcrSettings, PipelineSettings, RetrySettings,
};

pub const DEFAULT_AI_PROVIDER: ProviderKind = ProviderKind::Gemini;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_OCR_PROVIDERS: [OcrProviderKind; 2] = [OcrProviderKind::OcrSpace, OcrProviderKind::Tesseract];
pub const DEFAULT_OCR_PROVIDER_TIMEOUT_MS: u64 = 8_000;

pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_ROUND_TRIP_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MIN_SELECTION_PX: u32 = MIN_SELECTION_PX;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fill every unset field. User-set values are never overridden.
pub fn apply_all_defaults(settings: AppSettings) -> AppSettings {
    let settings = apply_ai_defaults(settings);
    let settings = apply_ocr_defaults(settings);
    let settings = apply_pipeline_defaults(settings);
    let settings = apply_retry_defaults(settings);
    apply_logging_defaults(settings)
}

fn apply_ai_defaults(mut settings: AppSettings) -> AppSettings {
    let ai = settings.ai.get_or_insert_with(AiSettings::default);
    ai.provider.get_or_insert_with(|| DEFAULT_AI_PROVIDER.as_str().to_string());
    ai.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    ai.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    ai.context_prompts.get_or_insert(false);
    settings
}

fn apply_ocr_defaults(mut settings: AppSettings) -> AppSettings {
    let ocr = settings.ocr.get_or_insert_with(OcrSettings::default);
    ocr.language.get_or_insert_with(|| DEFAULT_OCR_LANGUAGE.to_string());
    ocr.providers
        .get_or_insert_with(|| DEFAULT_OCR_PROVIDERS.iter().map(|k| k.as_str().to_string()).collect());
    ocr.provider_timeout_ms.get_or_insert(DEFAULT_OCR_PROVIDER_TIMEOUT_MS);
    ocr.preprocess.get_or_insert(false);
    settings
}

fn apply_pipeline_defaults(mut settings: AppSettings) -> AppSettings {
    let pipeline = settings.pipeline.get_or_insert_with(PipelineSettings::default);
    pipeline.capture_timeout_ms.get_or_insert(DEFAULT_CAPTURE_TIMEOUT_MS);
    pipeline.ai_timeout_ms.get_or_insert(DEFAULT_AI_TIMEOUT_MS);
    pipeline.round_trip_timeout_ms.get_or_insert(DEFAULT_ROUND_TRIP_TIMEOUT_MS);
    pipeline.min_selection_px.get_or_insert(DEFAULT_MIN_SELECTION_PX);
    settings
}

fn apply_retry_defaults(mut settings: AppSettings) -> AppSettings {
    let retry = settings.retry.get_or_insert_with(RetrySettings::default);
    retry.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
    retry.base_delay_ms.get_or_insert(DEFAULT_BASE_DELAY_MS);
    settings
}

fn apply_logging_defaults(mut settings: AppSettings) -> AppSettings {
    let logging = settings.logging.get_or_insert_with(LoggingSettings::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    settings
}
