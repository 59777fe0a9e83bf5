use std::path::{Path, PathBuf};

use anyhow::Result;
use snapsolve_ai::{AiClient, BackendRegistry};
use snapsolve_config::{config_dir, load_and_prepare, load_settings, settings_file_path, AppSettings};
use snapsolve_pipeline::retry_policy;

/// Where the CLI reads its settings from.
pub struct CliContext {
    settings_path: PathBuf,
}

impl CliContext {
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let settings_path = explicit.unwrap_or_else(|| settings_file_path(&config_dir()));
        Self { settings_path }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Start logging from the `logging` section. A broken file still gets a
    /// console logger so the load error itself is reported.
    pub async fn init_logging(&self, level_override: Option<&str>) {
        let logging = load_settings(&self.settings_path)
            .await
            .map(|s| s.logging_settings())
            .unwrap_or_default();
        let level = level_override
            .map(str::to_string)
            .or(logging.level)
            .unwrap_or_else(|| "info".to_string());
        let dir = logging.dir.map(PathBuf::from);
        snapsolve_logging::init_logger(dir.as_deref(), &level);
    }

    /// Load, apply defaults and validate.
    pub async fn settings(&self) -> Result<AppSettings> {
        load_and_prepare(&self.settings_path).await
    }

    pub fn ai_client(&self, settings: &AppSettings) -> AiClient {
        AiClient::new(BackendRegistry::with_defaults(retry_policy(&settings.retry_settings())))
    }
}
