use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use snapsolve_core::{CapturedImage, OcrProvider, OcrProviderError, OcrResult};

const NAME: &str = "tesseract";

/// Local Tesseract binary, fed through stdin/stdout.
pub struct TesseractProvider {
    binary: PathBuf,
    language: String,
}

impl TesseractProvider {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: language.into(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl OcrProvider for TesseractProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn try_extract(&self, image: &CapturedImage) -> Result<OcrResult, OcrProviderError> {
        debug!(binary = %self.binary.display(), language = %self.language, "Running tesseract");

        // psm 6: treat the crop as one uniform block of text.
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str(), "--psm", "6"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrProviderError::processing(NAME, format!("failed to start tesseract: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image.bytes())
                .await
                .map_err(|e| OcrProviderError::processing(NAME, format!("failed to send image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrProviderError::processing(NAME, format!("tesseract did not finish: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrProviderError::processing(
                NAME,
                format!("tesseract failed: {}", stderr.trim()),
            ));
        }

        Ok(OcrResult::text(NAME, String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}
