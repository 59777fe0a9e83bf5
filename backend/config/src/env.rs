//! `${VAR}` substitution in settings values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are recognised. `$${VAR}` is an
//! escape and yields the literal text `${VAR}`.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// A reference with an optional leading `$` that marks it as escaped.
static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at settings path: {settings_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub settings_path: String,
}

/// Substitute references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute references using `env`. Unset or empty variables are errors.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    settings_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_values() {
        let v = json!({"ai": {"apiKey": "${GEMINI_API_KEY}"}, "ocr": {"providers": ["${FIRST_OCR}"]}});
        let env = env(&[("GEMINI_API_KEY", "AIza123"), ("FIRST_OCR", "tesseract")]);
        let out = resolve_env_vars_with(&v, &env).unwrap();
        assert_eq!(out["ai"]["apiKey"], "AIza123");
        assert_eq!(out["ocr"]["providers"][0], "tesseract");
    }

    #[test]
    fn error_names_var_and_path() {
        let v = json!({"ai": {"apiKey": "${MISSING_KEY}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_KEY"));
        assert!(err.contains("ai.apiKey"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"prompt": "use $${NAME} literally, but ${NAME} here"});
        let out = resolve_env_vars_with(&v, &env(&[("NAME", "x")])).unwrap();
        assert_eq!(out["prompt"], "use ${NAME} literally, but x here");
    }

    #[test]
    fn lowercase_and_plain_strings_pass_through() {
        let v = json!({"a": "${lower}", "b": "plain", "n": 5});
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out, v);
    }
}
