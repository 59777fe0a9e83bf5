//! `snapsolve-config`: persisted settings.
//!
//! Provides:
//! - Typed settings schema (AI backend, OCR chain, timeouts, retry, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with dotted-path findings
//! - Credential redaction for display
//! - `SettingsStore`, read fresh by each pipeline run

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod store;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, load_settings, settings_file_path, write_settings};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    AiSettings, AppSettings, LoggingSettings, OcrProviderKind, OcrSettings, PipelineSettings, RetrySettings,
};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use validation::{validate, SettingsValidationError, ValidationReport};

use std::path::Path;

use anyhow::{bail, Result};

/// Load and validate. Warnings are logged; any error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<AppSettings> {
    let settings = load_settings(path).await?;

    let report = validate(&settings);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Settings warning");
    }
    if !report.is_valid() {
        let detail = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        bail!("invalid settings in {}: {}", path.display(), detail);
    }
    Ok(settings)
}
