use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use snapsolve_ai::AiClient;
use snapsolve_capture::{CaptureOptions, RegionCapture, ScreenSource};
use snapsolve_config::{AppSettings, SettingsStore};
use snapsolve_core::{
    spawn_with_deadline, CapturedImage, DeadlineError, DeclineManualInput, ImageEncoding, ManualInput,
    PipelineError, PipelineState, RunEventKind, SelectionRect, MIN_SELECTION_PX,
};
use snapsolve_ocr::{ChainOutcome, OcrChain};

use crate::builder::build_ocr_chain;
use crate::run::{RunReport, RunTracker};

/// What the UI surface handed over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// The user finished a drag over `rect`.
    Area {
        rect: SelectionRect,
        device_pixel_ratio: f64,
    },
    /// The user dismissed the overlay before capture started.
    Dismissed,
}

/// Drives one capture → OCR → AI run per call.
///
/// Holds only read-only collaborators, so concurrent runs never share state.
pub struct Orchestrator {
    screen: Arc<dyn ScreenSource>,
    settings: Arc<dyn SettingsStore>,
    ai: AiClient,
    manual: Arc<dyn ManualInput>,
    ocr: Option<Arc<OcrChain>>,
}

impl Orchestrator {
    pub fn new(screen: Arc<dyn ScreenSource>, settings: Arc<dyn SettingsStore>, ai: AiClient) -> Self {
        Self {
            screen,
            settings,
            ai,
            manual: Arc::new(DeclineManualInput),
            ocr: None,
        }
    }

    pub fn with_manual_input(mut self, manual: Arc<dyn ManualInput>) -> Self {
        self.manual = manual;
        self
    }

    /// Use a fixed chain instead of building one from settings per run.
    pub fn with_ocr_chain(mut self, chain: OcrChain) -> Self {
        self.ocr = Some(Arc::new(chain));
        self
    }

    /// Run the pipeline for one selection. Never fails; failures are in the report.
    #[instrument(skip(self))]
    pub async fn handle(&self, selection: Selection) -> RunReport {
        let mut run = RunTracker::new();

        let (rect, device_pixel_ratio) = match selection {
            Selection::Dismissed => {
                info!(run_id = %run.run_id(), "Selection dismissed");
                return run.discard("dismissed");
            }
            Selection::Area {
                rect,
                device_pixel_ratio,
            } => (rect, device_pixel_ratio),
        };

        if !rect.is_selectable(MIN_SELECTION_PX) {
            return discard_small(run, rect, MIN_SELECTION_PX);
        }

        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(e) => return run.fail(&e, None),
        };

        let min_px = settings.pipeline_settings().min_selection_px();
        if !rect.is_selectable(min_px) {
            return discard_small(run, rect, min_px);
        }

        let image = match self.capture(&mut run, &settings, rect, device_pixel_ratio).await {
            Ok(image) => image,
            Err(e) => {
                warn!(run_id = %run.run_id(), error = %e, "Capture failed");
                return run.fail(&e, None);
            }
        };

        let text = match self.extract_text(&mut run, &settings, image).await {
            Ok(text) => text,
            Err(e) => {
                warn!(run_id = %run.run_id(), error = %e, "Text extraction failed");
                return run.fail(&e, None);
            }
        };

        match self.ask_ai(&mut run, &text).await {
            Ok(answer) => {
                info!(run_id = %run.run_id(), chars = answer.chars().count(), "Run completed");
                run.succeed(text, answer)
            }
            Err(e) => {
                warn!(run_id = %run.run_id(), error = %e, "AI stage failed");
                run.fail(&e, Some(text))
            }
        }
    }

    async fn load_settings(&self) -> Result<AppSettings, PipelineError> {
        self.settings
            .load()
            .await
            .map_err(|e| PipelineError::Settings(format!("{e:#}")))
    }

    async fn capture(
        &self,
        run: &mut RunTracker,
        settings: &AppSettings,
        rect: SelectionRect,
        device_pixel_ratio: f64,
    ) -> Result<CapturedImage, PipelineError> {
        let options = CaptureOptions {
            encoding: ImageEncoding::Png,
            preprocess: settings.ocr_settings().preprocess(),
            timeout: settings.pipeline_settings().capture_timeout(),
        };
        let capture = Arc::new(RegionCapture::new(Arc::clone(&self.screen), options));

        run.advance(PipelineState::Capturing)?;
        let grabber = Arc::clone(&capture);
        let frame = contained("capture", async move { grabber.grab().await }).await??;

        run.advance(PipelineState::Cropping)?;
        let image = contained("crop", async move { capture.crop(&frame, rect, device_pixel_ratio) }).await??;
        Ok(image)
    }

    async fn extract_text(
        &self,
        run: &mut RunTracker,
        settings: &AppSettings,
        image: CapturedImage,
    ) -> Result<String, PipelineError> {
        run.advance(PipelineState::ExtractingText)?;

        let chain = match &self.ocr {
            Some(chain) => Arc::clone(chain),
            None => Arc::new(build_ocr_chain(&settings.ocr_settings())),
        };
        let manual = Arc::clone(&self.manual);
        let outcome: ChainOutcome =
            contained("ocr", async move { chain.run_with_manual_fallback(&image, manual.as_ref()).await }).await?;

        for attempt in &outcome.attempts {
            run.record(
                RunEventKind::OcrAttempt,
                json!({ "provider": attempt.provider, "elapsedMs": attempt.elapsed.as_millis() as u64 }),
            );
            if let Some(error) = &attempt.error {
                run.record(
                    RunEventKind::OcrProviderFailed,
                    json!({ "provider": attempt.provider, "error": error }),
                );
            }
        }
        if outcome.manual_requested {
            run.record(
                RunEventKind::ManualInputRequested,
                json!({ "accepted": outcome.result.success }),
            );
        }

        let result = outcome.result;
        match result.extracted_text {
            Some(text) if result.success => Ok(text),
            _ => Err(PipelineError::OcrExhausted(
                result.error.unwrap_or_else(|| "no text detected".to_string()),
            )),
        }
    }

    async fn ask_ai(&self, run: &mut RunTracker, text: &str) -> Result<String, PipelineError> {
        run.advance(PipelineState::AwaitingAi)?;

        // Credentials are read fresh here so edits made during OCR apply.
        let settings = self.load_settings().await?;
        let config = settings
            .ai_config()
            .map_err(|e| PipelineError::Settings(format!("{e:#}")))?;
        let timeout = settings.pipeline_settings().ai_timeout();

        run.record(
            RunEventKind::AiRequested,
            json!({
                "provider": config.provider.as_str(),
                "model": config.model,
                "timeoutMs": timeout.as_millis() as u64,
            }),
        );

        let client = self.ai.clone();
        let text = text.to_string();
        match spawn_with_deadline(timeout, async move { client.get_ai_response(&text, &config).await }).await {
            Ok(answer) => Ok(answer?),
            Err(DeadlineError::Elapsed(after)) => Err(PipelineError::Timeout(after)),
            Err(DeadlineError::Panicked(msg)) => Err(PipelineError::Internal(format!("AI backend panicked: {msg}"))),
        }
    }
}

fn discard_small(run: RunTracker, rect: SelectionRect, min_px: u32) -> RunReport {
    info!(run_id = %run.run_id(), width = rect.width, height = rect.height, min_px, "Selection too small");
    run.discard("selection too small")
}

/// Run a stage on its own task so a panic ends the run instead of the caller.
async fn contained<F>(stage: &'static str, fut: F) -> Result<F::Output, PipelineError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| PipelineError::Internal(format!("{stage} stage failed: {e}")))
}
