use std::path::PathBuf;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use snapsolve_core::CaptureError;

/// Platform hook that snapshots the visible viewport.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    async fn grab_viewport(&self) -> Result<DynamicImage, CaptureError>;
}

/// Reads the viewport snapshot from an image file, e.g. one written by a
/// platform screenshot tool.
pub struct FileScreenSource {
    path: PathBuf,
}

impl FileScreenSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScreenSource for FileScreenSource {
    async fn grab_viewport(&self) -> Result<DynamicImage, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                CaptureError::PermissionDenied(format!("permission denied reading {}", self.path.display()))
            }
            _ => CaptureError::Unavailable(format!("cannot read {}: {}", self.path.display(), e)),
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Viewport snapshot read");

        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| CaptureError::Unavailable(format!("decoder task failed: {e}")))?
            .map_err(|e| CaptureError::Unavailable(format!("cannot decode viewport snapshot: {e}")))
    }
}

/// A viewport snapshot that is already in memory.
pub struct MemoryScreenSource {
    frame: DynamicImage,
}

impl MemoryScreenSource {
    pub fn new(frame: DynamicImage) -> Self {
        Self { frame }
    }
}

#[async_trait]
impl ScreenSource for MemoryScreenSource {
    async fn grab_viewport(&self) -> Result<DynamicImage, CaptureError> {
        Ok(self.frame.clone())
    }
}
