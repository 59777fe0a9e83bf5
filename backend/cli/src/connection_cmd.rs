use std::time::Duration;

use anyhow::Result;

use snapsolve_ai::test_connection;

use crate::context::CliContext;
use crate::terminal_output::{note_error, note_info, note_success};

pub async fn run(ctx: &CliContext, timeout: Duration) -> Result<bool> {
    let settings = ctx.settings().await?;
    let config = settings.ai_config()?;
    let client = ctx.ai_client(&settings);

    note_info(&format!("Testing {} ...", config.provider));
    let report = test_connection(&client, &config, timeout).await;

    if report.success {
        note_success(&report.message);
    } else {
        note_error(&report.message);
    }
    if !report.model.is_empty() {
        println!("  model:   {}", report.model);
    }
    println!("  latency: {}ms", report.latency_ms);
    Ok(report.success)
}
