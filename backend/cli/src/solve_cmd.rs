//! `snapsolve solve`: the UI trigger surface.
//!
//! Sends the selection over the presentation channel to a background
//! pipeline service and prints the single result that comes back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use snapsolve_capture::FileScreenSource;
use snapsolve_config::FileSettingsStore;
use snapsolve_core::{PipelineResult, SelectionRect};
use snapsolve_pipeline::{open_channel, serve, Orchestrator};

use crate::context::CliContext;
use crate::manual_input::LineManualInput;
use crate::terminal_output::{note_error, note_info, note_success, note_warn};

pub struct SolveArgs {
    pub screenshot: PathBuf,
    pub rect: SelectionRect,
    pub device_pixel_ratio: f64,
    pub json: bool,
}

/// Returns whether the run produced an answer.
pub async fn run(ctx: &CliContext, args: SolveArgs) -> Result<bool> {
    let settings = ctx.settings().await?;
    info!(
        screenshot = %args.screenshot.display(),
        x = args.rect.x,
        y = args.rect.y,
        width = args.rect.width,
        height = args.rect.height,
        dpr = args.device_pixel_ratio,
        "Solving selection"
    );

    let orchestrator = Orchestrator::new(
        Arc::new(FileScreenSource::new(&args.screenshot)),
        Arc::new(FileSettingsStore::new(ctx.settings_path())),
        ctx.ai_client(&settings),
    )
    .with_manual_input(Arc::new(LineManualInput::stdin()));

    let (ui, background) = open_channel(settings.pipeline_settings().round_trip_timeout());
    let service = tokio::spawn(serve(Arc::new(orchestrator), background));

    let result = ui.request(args.rect, args.device_pixel_ratio).await;
    drop(ui);
    service.await.context("pipeline service task failed")?;

    if args.json {
        let value = match &result {
            Some(result) => serde_json::to_value(result)?,
            None => serde_json::Value::Null,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_result(result.as_ref());
    }
    Ok(result.is_some_and(|r| r.success))
}

fn print_result(result: Option<&PipelineResult>) {
    let Some(result) = result else {
        note_warn("Selection was too small; nothing to do.");
        return;
    };
    if let Some(text) = &result.extracted_text {
        note_info(&format!("Question: {text}"));
    }
    match (&result.ai_response, &result.error) {
        (Some(answer), _) if result.success => {
            note_success("Answer:");
            println!("{answer}");
        }
        (_, Some(error)) => note_error(error),
        _ => note_error("run failed without a message"),
    }
}
