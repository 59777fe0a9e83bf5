mod config_cmd;
mod connection_cmd;
mod context;
mod doctor_cmd;
mod manual_input;
mod solve_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use context::CliContext;

#[derive(Parser)]
#[command(name = "snapsolve")]
#[command(about = "snapsolve: select a region, read the question, get an answer")]
#[command(version)]
struct Cli {
    /// Settings file (default: $SNAPSOLVE_CONFIG_DIR/settings.yaml or ~/.snapsolve/settings.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter, e.g. `debug` or `snapsolve_ai=trace` (RUST_LOG wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer the question inside a region of a screenshot
    Solve {
        /// Viewport snapshot (PNG or JPEG)
        #[arg(long)]
        screenshot: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Device pixel ratio of the display the selection was made on
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a tiny prompt to the configured AI backend
    TestConnection {
        #[arg(long, default_value_t = 15_000)]
        timeout_ms: u64,
    },
    /// Check settings, OCR providers and the AI backend
    Doctor,
    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings with credentials masked
    Show,
    /// Write a settings file with every default filled in
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = CliContext::resolve(cli.config);
    ctx.init_logging(cli.log_level.as_deref()).await;

    match cli.command {
        Commands::Solve {
            screenshot,
            x,
            y,
            width,
            height,
            dpr,
            json,
        } => {
            let success = solve_cmd::run(&ctx, solve_cmd::SolveArgs {
                screenshot,
                rect: snapsolve_core::SelectionRect::new(x, y, width, height),
                device_pixel_ratio: dpr,
                json,
            })
            .await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::TestConnection { timeout_ms } => {
            if !connection_cmd::run(&ctx, std::time::Duration::from_millis(timeout_ms)).await? {
                std::process::exit(1);
            }
        }
        Commands::Doctor => {
            if !doctor_cmd::run(&ctx).await? {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&ctx).await?,
            ConfigAction::Init { force } => config_cmd::init(&ctx, force).await?,
        },
    }

    Ok(())
}
