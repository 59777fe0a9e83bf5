//! Settings validation with dotted-path findings.

use thiserror::Error;

use snapsolve_core::{ProviderKind, MIN_SELECTION_PX};

use crate::schema::{AppSettings, OcrProviderKind};

#[derive(Debug, Clone, Error)]
#[error("settings validation error at '{path}': {message}")]
pub struct SettingsValidationError {
    pub path: String,
    pub message: String,
}

/// All findings from one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<SettingsValidationError>,
    pub warnings: Vec<SettingsValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SettingsValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(SettingsValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(settings: &AppSettings) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_ai(settings, &mut report);
    validate_ocr(settings, &mut report);
    validate_pipeline(settings, &mut report);
    validate_logging(settings, &mut report);
    report
}

fn validate_ai(settings: &AppSettings, report: &mut ValidationReport) {
    let Some(ai) = &settings.ai else { return };

    let provider = match ai.provider.as_deref().map(str::parse::<ProviderKind>) {
        Some(Ok(kind)) => Some(kind),
        Some(Err(e)) => {
            report.error("ai.provider", format!("{e}; use one of huggingface, groq, ollama, gemini, openai_compatible"));
            None
        }
        None => None,
    };

    let has_key = ai.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if let Some(kind) = provider {
        if kind.requires_api_key() && !has_key {
            report.warn("ai.apiKey", format!("{} is required for {kind}", kind.credential_name()));
        }
        if kind == ProviderKind::OpenAiCompatible && ai.endpoint_url.is_none() {
            report.warn("ai.endpointUrl", "not set; requests go to https://api.openai.com/v1");
        }
    }

    if let Some(url) = ai.endpoint_url.as_deref() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("ai.endpointUrl", format!("'{url}' is not an http(s) URL"));
        }
    }
    if ai.max_tokens == Some(0) {
        report.error("ai.maxTokens", "maxTokens must be >= 1");
    }
    if let Some(t) = ai.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("ai.temperature", format!("temperature {t} is outside 0.0..=2.0"));
        }
    }
    if let Some(template) = ai.user_prompt_template.as_deref() {
        if !template.contains("{text}") {
            report.warn("ai.userPromptTemplate", "no {text} placeholder; the question is appended at the end");
        }
    }
}

fn validate_ocr(settings: &AppSettings, report: &mut ValidationReport) {
    let Some(ocr) = &settings.ocr else { return };

    if let Some(providers) = &ocr.providers {
        if providers.is_empty() {
            report.warn("ocr.providers", "no OCR providers; every run falls back to manual input");
        }
        let mut seen = Vec::new();
        for (i, name) in providers.iter().enumerate() {
            match name.parse::<OcrProviderKind>() {
                Ok(kind) if seen.contains(&kind) => {
                    report.warn(format!("ocr.providers[{i}]"), format!("'{name}' is listed twice"));
                }
                Ok(kind) => seen.push(kind),
                Err(e) => report.error(
                    format!("ocr.providers[{i}]"),
                    format!("{e}; use ocr_space, huggingface, ollama or tesseract"),
                ),
            }
        }
    }
    if ocr.provider_timeout_ms == Some(0) {
        report.error("ocr.providerTimeoutMs", "providerTimeoutMs must be > 0");
    }
}

fn validate_pipeline(settings: &AppSettings, report: &mut ValidationReport) {
    let Some(pipeline) = &settings.pipeline else { return };

    for (path, value) in [
        ("pipeline.captureTimeoutMs", pipeline.capture_timeout_ms),
        ("pipeline.aiTimeoutMs", pipeline.ai_timeout_ms),
        ("pipeline.roundTripTimeoutMs", pipeline.round_trip_timeout_ms),
    ] {
        if value == Some(0) {
            report.error(path, "timeout must be > 0");
        }
    }

    if let Some(px) = pipeline.min_selection_px.filter(|px| *px < MIN_SELECTION_PX) {
        report.error(
            "pipeline.minSelectionPx",
            format!("{px} is below the {MIN_SELECTION_PX}px floor"),
        );
    }

    if let (Some(ai), Some(round_trip)) = (pipeline.ai_timeout_ms, pipeline.round_trip_timeout_ms) {
        if round_trip <= ai {
            report.warn(
                "pipeline.roundTripTimeoutMs",
                "shorter than aiTimeoutMs; the UI may give up before the AI deadline fires",
            );
        }
    }
}

fn validate_logging(settings: &AppSettings, report: &mut ValidationReport) {
    let Some(level) = settings.logging.as_ref().and_then(|l| l.level.as_deref()) else { return };
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        report.warn("logging.level", format!("unknown level '{level}'; falling back to info"));
    }
}
