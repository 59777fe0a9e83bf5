//! `snapsolve doctor`: settings findings, OCR provider reachability and the
//! AI backend's model listing.

use std::time::Duration;

use anyhow::Result;

use snapsolve_config::{load_settings, validate, AppSettings, ValidationReport};
use snapsolve_pipeline::build_ocr_providers;

use crate::context::CliContext;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns whether every required check passed.
pub async fn run(ctx: &CliContext) -> Result<bool> {
    println!("\n🔍 Running snapsolve doctor...\n");

    let settings = load_settings(ctx.settings_path()).await?;
    println!("Settings file: {}", ctx.settings_path().display());
    let settings_ok = check_settings(&validate(&settings));
    let ocr_ok = check_ocr(&settings).await;
    let ai_ok = check_ai(ctx, &settings).await;

    println!();
    let all_ok = settings_ok && ocr_ok && ai_ok;
    if all_ok {
        println!("✅ All checks passed! snapsolve is ready.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }
    Ok(all_ok)
}

fn check_settings(report: &ValidationReport) -> bool {
    println!("Checking settings:");
    for error in &report.errors {
        println!("  🔴 {}: {}", error.path, error.message);
    }
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("  🟢 no findings");
    }
    report.is_valid()
}

/// At least one provider must be reachable for the chain to have a chance.
async fn check_ocr(settings: &AppSettings) -> bool {
    println!("Checking OCR providers:");
    let providers = build_ocr_providers(&settings.ocr_settings());
    if providers.is_empty() {
        println!("  🔴 no OCR providers configured");
        return false;
    }

    let mut any_available = false;
    for provider in &providers {
        let available = tokio::time::timeout(PROBE_TIMEOUT, provider.is_available())
            .await
            .unwrap_or(false);
        if available {
            println!("  🟢 {} is available", provider.name());
            any_available = true;
        } else {
            println!("  🟡 {} is not reachable", provider.name());
        }
    }
    any_available
}

async fn check_ai(ctx: &CliContext, settings: &AppSettings) -> bool {
    println!("Checking AI backend:");
    let config = match settings.ai_config() {
        Ok(config) => config,
        Err(e) => {
            println!("  🔴 {e}");
            return false;
        }
    };
    if config.provider.requires_api_key() && config.api_key().is_none() {
        println!("  🔴 {} is not configured", config.provider.credential_name());
        return false;
    }

    let client = ctx.ai_client(settings);
    let backend = match client.registry().get(config.provider) {
        Ok(backend) => backend,
        Err(e) => {
            println!("  🔴 {e}");
            return false;
        }
    };
    match tokio::time::timeout(PROBE_TIMEOUT, backend.list_models(&config)).await {
        Ok(Ok(models)) if models.is_empty() => {
            println!("  🟡 {} offers no model listing", config.provider);
        }
        Ok(Ok(models)) => {
            println!("  🟢 {} lists {} models", config.provider, models.len());
        }
        Ok(Err(e)) => {
            println!("  🔴 {e}");
            return false;
        }
        Err(_) => {
            println!("  🔴 {} did not answer within {}ms", config.provider, PROBE_TIMEOUT.as_millis());
            return false;
        }
    }
    let model = backend.resolve_model(&config).await;
    if !model.is_empty() {
        println!("  🟢 model: {model}");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsolve_config::SettingsValidationError;

    #[test]
    fn test_warnings_do_not_fail_settings_check() {
        let report = ValidationReport {
            errors: vec![],
            warnings: vec![SettingsValidationError {
                path: "ai.apiKey".into(),
                message: "not set".into(),
            }],
        };
        assert!(check_settings(&report));
    }

    #[tokio::test]
    async fn test_empty_chain_fails_ocr_check() {
        let settings = AppSettings {
            ocr: Some(snapsolve_config::OcrSettings {
                providers: Some(vec![]),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!check_ocr(&settings).await);
    }
}
