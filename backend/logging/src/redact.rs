//! Scrubs provider credentials from strings before they are logged.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Google, Groq, Hugging Face and OpenAI style keys, plus bearer tokens.
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(AIza[0-9A-Za-z_\-]{20,})|(gsk_[0-9A-Za-z]{20,})|(hf_[0-9A-Za-z]{20,})|(sk-[0-9A-Za-z_\-]{20,})|(Bearer\s+[0-9A-Za-z\-\._~+/]+=*)",
    )
    .unwrap()
});

/// `key=` and `apikey=` query or form parameters.
static KEY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b((?:api)?key=)[^&\s"']+"#).unwrap());

pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    KEY_PARAM_RE.replace_all(&redacted, "${1}[REDACTED]").into_owned()
}

/// Redact every string leaf of a JSON value.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), redact_json(v))).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_provider_keys() {
        let raw = "keys AIzaSyA1234567890abcdefghij gsk_abcdefghijklmnopqrstuv hf_abcdefghijklmnopqrstuv sk-proj-abcdefghijklmnopqrst";
        let clean = redact_sensitive_data(raw);
        assert_eq!(clean.matches("[REDACTED_TOKEN]").count(), 4);
        assert!(!clean.contains("AIzaSy"));
    }

    #[test]
    fn test_redacts_bearer_and_query_key() {
        let raw = "GET https://generativelanguage.googleapis.com/v1/models?key=secret123&pageSize=5 Bearer eyJhbGciOiJIUzI1NiJ9";
        let clean = redact_sensitive_data(raw);
        assert!(clean.contains("?key=[REDACTED]&pageSize=5"));
        assert!(!clean.contains("eyJhbGci"));
    }

    #[test]
    fn test_leaves_question_text_alone() {
        let raw = "What is 555-123-4567 minus sk-1? hf_ is a prefix";
        assert_eq!(redact_sensitive_data(raw), raw);
    }

    #[test]
    fn test_redact_json_walks_nested_values() {
        let v = serde_json::json!({"error": ["failed with key=abc"], "n": 3});
        let out = redact_json(&v);
        assert_eq!(out["error"][0], "failed with key=[REDACTED]");
        assert_eq!(out["n"], 3);
    }
}
