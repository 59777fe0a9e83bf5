//! Settings file read/write with atomic backup rotation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::defaults::apply_all_defaults;
use crate::env::resolve_env_vars;
use crate::schema::AppSettings;

const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 5;

/// `SNAPSOLVE_CONFIG_DIR` if set, else `~/.snapsolve/`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SNAPSOLVE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".snapsolve"),
        None => PathBuf::from(".snapsolve"),
    }
}

pub fn settings_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE_NAME)
}

/// Read the file, substitute env vars and apply defaults.
///
/// A missing file is a first run and yields the defaults.
pub async fn load_settings(path: &Path) -> Result<AppSettings> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Settings file does not exist; using defaults");
        return Ok(apply_all_defaults(AppSettings::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(apply_all_defaults(AppSettings::default()));
    }
    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse settings YAML at: {}", path.display()))?;
    // A file holding only comments parses as null.
    let value = match value {
        Value::Null => Value::Object(Default::default()),
        value => resolve_env_vars(&value).context("Failed to resolve env vars in settings")?,
    };

    let settings: AppSettings = serde_json::from_value(value)
        .with_context(|| format!("Invalid settings in: {}", path.display()))?;

    debug!(path = %path.display(), "Loaded settings");
    Ok(apply_all_defaults(settings))
}

/// Write settings atomically (temp file, then rename), backing up the previous file.
pub async fn write_settings(settings: &AppSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create settings directory: {}", parent.display()))?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(settings).context("Failed to serialize settings to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp settings: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp settings to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote settings");
    Ok(())
}

/// settings.yaml.bak.1 → .bak.2 → … → .bak.N, then copy the current file to .bak.1.
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{i}"));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if fs::try_exists(&old).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!(backup = %old.display(), error = %e, "Failed to rotate settings backup");
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!(backup = %bak.display(), error = %e, "Failed to back up settings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsolve_core::ProviderKind;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("settings.yaml")).await.unwrap();
        assert_eq!(settings.ai_config().unwrap().provider, ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "").unwrap();
        let settings = load_settings(&path).await.unwrap();
        assert_eq!(settings.pipeline_settings().ai_timeout_ms, Some(15_000));
    }

    #[tokio::test]
    async fn write_then_load_keeps_values_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = settings_file_path(dir.path());

        let mut settings = apply_all_defaults(AppSettings::default());
        write_settings(&settings, &path).await.unwrap();

        if let Some(ai) = settings.ai.as_mut() {
            ai.provider = Some("ollama".into());
        }
        write_settings(&settings, &path).await.unwrap();

        let loaded = load_settings(&path).await.unwrap();
        assert_eq!(loaded.ai_config().unwrap().provider, ProviderKind::Ollama);
        assert!(path.with_extension("yaml.bak.1").exists());
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_yaml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "ai: [unclosed").unwrap();
        let err = load_settings(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("settings.yaml"));
    }
}
