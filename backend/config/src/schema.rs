//! Snapsolve settings schema.
//!
//! Every field is optional on disk; `defaults::apply_all_defaults` fills the
//! gaps after parsing, and the accessors below fall back to the same
//! constants so a partially filled value is still usable.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use snapsolve_core::{AiConfig, ProviderKind, MIN_SELECTION_PX};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// AI backend selection and call parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiSettings>,

    /// OCR chain order and provider options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrSettings>,

    /// Timeouts and selection limits for one run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineSettings>,

    /// Rate-limit backoff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSettings>,
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    /// `huggingface` | `groq` | `ollama` | `gemini` | `openai_compatible`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Unset means discover (gemini, ollama) or use the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Must contain `{text}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt_template: Option<String>,
    /// Classify the text and use the matching prompts when no override is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_prompts: Option<bool>,
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

/// OCR engines the chain can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrProviderKind {
    OcrSpace,
    HuggingFace,
    Ollama,
    Tesseract,
}

impl OcrProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OcrSpace => "ocr_space",
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
            Self::Tesseract => "tesseract",
        }
    }
}

impl FromStr for OcrProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ocr_space" | "ocrspace" => Ok(Self::OcrSpace),
            "huggingface" | "hugging_face" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            "tesseract" => Ok(Self::Tesseract),
            other => Err(format!("unknown OCR provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrSettings {
    /// Tesseract-style language code, e.g. `eng`, `vie`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Chain order; earlier entries win ties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timeout_ms: Option<u64>,
    /// Binarize the crop before OCR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocess: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_space_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_space_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugging_face_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugging_face_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_path: Option<String>,
}

impl OcrSettings {
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_OCR_LANGUAGE)
    }

    /// Configured chain order. Unknown names are skipped; validation reports them.
    pub fn provider_kinds(&self) -> Vec<OcrProviderKind> {
        match &self.providers {
            Some(names) => names.iter().filter_map(|n| n.parse().ok()).collect(),
            None => DEFAULT_OCR_PROVIDERS.to_vec(),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms.unwrap_or(DEFAULT_OCR_PROVIDER_TIMEOUT_MS))
    }

    pub fn preprocess(&self) -> bool {
        self.preprocess.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_trip_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_selection_px: Option<u32>,
}

impl PipelineSettings {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms.unwrap_or(DEFAULT_CAPTURE_TIMEOUT_MS))
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms.unwrap_or(DEFAULT_AI_TIMEOUT_MS))
    }

    pub fn round_trip_timeout(&self) -> Duration {
        Duration::from_millis(self.round_trip_timeout_ms.unwrap_or(DEFAULT_ROUND_TRIP_TIMEOUT_MS))
    }

    pub fn min_selection_px(&self) -> u32 {
        self.min_selection_px
            .unwrap_or(DEFAULT_MIN_SELECTION_PX)
            .max(MIN_SELECTION_PX)
    }
}

// ---------------------------------------------------------------------------
// Retry / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
}

impl RetrySettings {
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for JSON log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl AppSettings {
    /// Build the per-call AI configuration.
    pub fn ai_config(&self) -> Result<AiConfig> {
        let ai = self.ai.clone().unwrap_or_default();
        let provider = match ai.provider.as_deref() {
            Some(name) => ProviderKind::from_str(name).map_err(|e| anyhow!(e))?,
            None => DEFAULT_AI_PROVIDER,
        };
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(AiConfig {
            provider,
            api_key: non_blank(ai.api_key),
            endpoint_url: non_blank(ai.endpoint_url),
            model: non_blank(ai.model),
            max_tokens: ai.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: ai.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            system_prompt: non_blank(ai.system_prompt),
            user_prompt_template: non_blank(ai.user_prompt_template),
            context_prompts: ai.context_prompts.unwrap_or(false),
        })
    }

    pub fn ocr_settings(&self) -> OcrSettings {
        self.ocr.clone().unwrap_or_default()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        self.pipeline.clone().unwrap_or_default()
    }

    pub fn retry_settings(&self) -> RetrySettings {
        self.retry.clone().unwrap_or_default()
    }

    pub fn logging_settings(&self) -> LoggingSettings {
        self.logging.clone().unwrap_or_default()
    }
}
