use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::fs;

use snapsolve_config::{apply_all_defaults, load_settings, redact, write_settings, AppSettings};

use crate::context::CliContext;
use crate::terminal_output::{note_info, note_success};

/// Print the effective settings with credentials masked.
pub async fn show(ctx: &CliContext) -> Result<()> {
    let settings = load_settings(ctx.settings_path()).await?;
    note_info(&format!("Settings file: {}", ctx.settings_path().display()));
    print!("{}", render_redacted(&settings)?);
    Ok(())
}

fn render_redacted(settings: &AppSettings) -> Result<String> {
    let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
    serde_yaml::to_string(&redact(&value)).context("Failed to render settings")
}

/// Write a settings file holding every default.
pub async fn init(ctx: &CliContext, force: bool) -> Result<()> {
    init_at(ctx.settings_path(), force).await?;
    note_success(&format!("Wrote {}", ctx.settings_path().display()));
    Ok(())
}

async fn init_at(path: &Path, force: bool) -> Result<()> {
    if !force && fs::try_exists(path).await.unwrap_or(false) {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_settings(&apply_all_defaults(AppSettings::default()), path).await
}
