//! Read-only settings access for the pipeline.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::load_and_prepare;
use crate::schema::AppSettings;

/// Where a run reads its settings. Called at the start of each run and again
/// when the run reaches the AI stage, so edits made in between are picked up.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<AppSettings>;
}

/// Re-reads and validates the YAML file on every call.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<AppSettings> {
        load_and_prepare(&self.path).await
    }
}

/// In-memory settings, replaceable at runtime.
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<AppSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub async fn replace(&self, settings: AppSettings) {
        *self.settings.write().await = settings;
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<AppSettings> {
        Ok(self.settings.read().await.clone())
    }
}
