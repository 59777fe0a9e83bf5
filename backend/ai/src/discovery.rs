//! Model auto-discovery.
//!
//! Selection is pure so it can be tested without a server; the listing
//! calls live with each backend. Callers fall back to a hard-coded default
//! when listing fails or nothing matches. That default can go stale
//! upstream, so a failed call after discovery is logged with the model name.

use serde::Deserialize;

/// One entry of Gemini's `GET /v1/models` listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModel {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiModelList {
    #[serde(default)]
    pub models: Vec<GeminiModel>,
}

/// First gemini-family model that can `generateContent`, else the first
/// model of any family that can.
pub fn pick_gemini_model(models: &[GeminiModel]) -> Option<String> {
    let generates = |m: &&GeminiModel| m.supported_generation_methods.iter().any(|g| g == "generateContent");
    models
        .iter()
        .filter(generates)
        .find(|m| m.name.contains("gemini"))
        .or_else(|| models.iter().find(generates))
        .map(|m| m.name.clone())
}

#[derive(Debug, Deserialize)]
pub struct OllamaTags {
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaTag {
    pub name: String,
}

/// First installed model from the llama family.
pub fn pick_ollama_model(names: &[String]) -> Option<String> {
    names.iter().find(|n| n.contains("llama")).cloned()
}
