use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};

/// Selections narrower or shorter than this (in CSS pixels) are treated as noise.
pub const MIN_SELECTION_PX: u32 = 10;

/// Recognized text shorter than this after trimming counts as "no text detected".
pub const MIN_OCR_TEXT_CHARS: usize = 2;

/// The user's drag-selection in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SelectionRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build the rectangle spanned by a pointer-down and pointer-up position.
    ///
    /// The drag may go in any direction; negative coordinates are clamped to
    /// the viewport origin.
    pub fn from_drag(start: (i64, i64), end: (i64, i64)) -> Self {
        let left = start.0.min(end.0).max(0);
        let top = start.1.min(end.1).max(0);
        let right = start.0.max(end.0).max(0);
        let bottom = start.1.max(end.1).max(0);
        Self {
            x: clamp_u32(left),
            y: clamp_u32(top),
            width: clamp_u32(right - left),
            height: clamp_u32(bottom - top),
        }
    }

    /// Whether the selection is large enough to start a pipeline run.
    pub fn is_selectable(&self, min_px: u32) -> bool {
        self.width >= min_px && self.height >= min_px
    }

    /// Scale into physical pixels for a display with the given device pixel ratio.
    pub fn scaled(&self, device_pixel_ratio: f64) -> Self {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let scale = |v: u32| (f64::from(v) * ratio).round() as u32;
        Self {
            x: scale(self.x),
            y: scale(self.y),
            width: scale(self.width),
            height: scale(self.height),
        }
    }
}

fn clamp_u32(v: i64) -> u32 {
    v.clamp(0, i64::from(u32::MAX)) as u32
}

/// Raster encoding of a captured image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Png,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// A single-frame encoded image produced by the capture stage.
///
/// Cloning shares the underlying buffer, so handing the image to a provider
/// task does not copy the pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    encoding: ImageEncoding,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, encoding: ImageEncoding, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:image/png;base64,...` form accepted by most hosted OCR APIs.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.encoding.mime_type(), self.to_base64())
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("encoding", &self.encoding)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Outcome of one OCR attempt (a provider, or the manual-input path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the provider that produced this result, `manual` for typed input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl OcrResult {
    pub fn text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            success: true,
            extracted_text: Some(text.into()),
            error: None,
            source: Some(source.into()),
        }
    }

    pub fn failure(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            extracted_text: None,
            error: Some(error.into()),
            source: Some(source.into()),
        }
    }

    /// Trimmed text if this result counts as a success (at least `min_chars` characters).
    pub fn usable_text(&self, min_chars: usize) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.extracted_text
            .as_deref()
            .map(str::trim)
            .filter(|t| t.chars().count() >= min_chars)
    }
}

/// Closed set of AI backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    HuggingFace,
    Groq,
    Ollama,
    Gemini,
    OpenAiCompatible,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        Self::HuggingFace,
        Self::Groq,
        Self::Ollama,
        Self::Gemini,
        Self::OpenAiCompatible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
            Self::OpenAiCompatible => "openai_compatible",
        }
    }

    /// Human name of the credential this backend authenticates with.
    pub fn credential_name(&self) -> &'static str {
        match self {
            Self::HuggingFace => "Hugging Face token",
            Self::Groq => "Groq API key",
            Self::Ollama => "Ollama endpoint URL",
            Self::Gemini => "Google API key",
            Self::OpenAiCompatible => "OpenAI-compatible API key",
        }
    }

    /// Whether a call cannot be made at all without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq | Self::Gemini | Self::OpenAiCompatible)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "huggingface" | "hugging_face" => Ok(Self::HuggingFace),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "gemini" | "google" => Ok(Self::Gemini),
            "openai_compatible" | "openai" => Ok(Self::OpenAiCompatible),
            other => Err(format!("unknown AI provider: {other}")),
        }
    }
}

/// Settings for one AI call. Read once per run and never mutated mid-request.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Explicit model; `None` lets the backend discover one.
    #[serde(default)]
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// User prompt with a `{text}` placeholder for the recognized question.
    #[serde(default)]
    pub user_prompt_template: Option<String>,
    /// Pick the default prompts by what the text looks like (math, code, ...).
    #[serde(default)]
    pub context_prompts: bool,
}

impl AiConfig {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            api_key: None,
            endpoint_url: None,
            model: None,
            max_tokens: 500,
            temperature: 0.7,
            system_prompt: None,
            user_prompt_template: None,
            context_prompts: false,
        }
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("endpoint_url", &self.endpoint_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("context_prompts", &self.context_prompts)
            .finish_non_exhaustive()
    }
}

/// Terminal value of one pipeline run, rendered verbatim by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl PipelineResult {
    pub fn answered(extracted_text: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            success: true,
            extracted_text: Some(extracted_text.into()),
            ai_response: Some(ai_response.into()),
            error: None,
            error_kind: None,
        }
    }

    /// Failure result; keeps any text recognized before the failing stage.
    pub fn failed(error: &PipelineError, extracted_text: Option<String>) -> Self {
        Self {
            success: false,
            extracted_text,
            ai_response: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

/// Orchestrator states, in the only order a run may visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Capturing,
    Cropping,
    ExtractingText,
    AwaitingAi,
    Done { success: bool },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Position in the fixed state order; `Idle` is 0.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Capturing => 1,
            Self::Cropping => 2,
            Self::ExtractingText => 3,
            Self::AwaitingAi => 4,
            Self::Done { .. } => 5,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Capturing => f.write_str("capturing"),
            Self::Cropping => f.write_str("cropping"),
            Self::ExtractingText => f.write_str("extracting_text"),
            Self::AwaitingAi => f.write_str("awaiting_ai"),
            Self::Done { success: true } => f.write_str("done(success)"),
            Self::Done { success: false } => f.write_str("done(failure)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_normalizes_direction() {
        let rect = SelectionRect::from_drag((210, 90), (10, 10));
        assert_eq!(rect, SelectionRect::new(10, 10, 200, 80));
    }

    #[test]
    fn test_drag_clamps_negative_coordinates() {
        let rect = SelectionRect::from_drag((-5, -5), (20, 30));
        assert_eq!(rect, SelectionRect::new(0, 0, 20, 30));
    }

    #[test]
    fn test_selectable_threshold() {
        assert!(SelectionRect::new(0, 0, 10, 10).is_selectable(MIN_SELECTION_PX));
        assert!(!SelectionRect::new(0, 0, 9, 200).is_selectable(MIN_SELECTION_PX));
        assert!(!SelectionRect::new(0, 0, 200, 9).is_selectable(MIN_SELECTION_PX));
    }

    #[test]
    fn test_scaled_by_pixel_ratio() {
        let rect = SelectionRect::new(10, 10, 200, 80).scaled(2.0);
        assert_eq!(rect, SelectionRect::new(20, 20, 400, 160));
        // nonsense ratios fall back to 1.0
        assert_eq!(SelectionRect::new(1, 2, 3, 4).scaled(f64::NAN), SelectionRect::new(1, 2, 3, 4));
    }

    #[test]
    fn test_usable_text_requires_two_chars() {
        assert_eq!(OcrResult::text("p", "  ok ").usable_text(MIN_OCR_TEXT_CHARS), Some("ok"));
        assert_eq!(OcrResult::text("p", " a ").usable_text(MIN_OCR_TEXT_CHARS), None);
        assert_eq!(OcrResult::failure("p", "boom").usable_text(MIN_OCR_TEXT_CHARS), None);
    }

    #[test]
    fn test_data_url() {
        let img = CapturedImage::new(vec![1, 2, 3], ImageEncoding::Png, 1, 1);
        assert_eq!(img.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!("openai-compatible".parse::<ProviderKind>(), Ok(ProviderKind::OpenAiCompatible));
        assert!("claude".parse::<ProviderKind>().is_err());
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_ai_config_debug_hides_key() {
        let config = AiConfig::new(ProviderKind::Groq).with_api_key("gsk_secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_secret"));
    }

    #[test]
    fn test_pipeline_result_wire_names() {
        let result = PipelineResult::answered("2+2=?", "4");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["extractedText"], "2+2=?");
        assert_eq!(json["aiResponse"], "4");
        assert!(json.get("error").is_none());
    }
}
