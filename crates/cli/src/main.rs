//! Cliplens CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Initialize config directory & default config
//! - `template` — Inspect a parsed field template
//! - `process`  — Run a template against a media manifest

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod manifest;

#[derive(Parser)]
#[command(
    name = "cliplens",
    about = "Cliplens — structured field extraction for video",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Show a template's parsed fields and planned groups
    Template {
        /// Path to the template JSON
        path: PathBuf,

        /// Brand-knowledge JSON folded into field descriptions
        #[arg(short, long)]
        brand: Option<PathBuf>,
    },

    /// Process a template against a media manifest
    Process {
        /// Path to the template JSON
        #[arg(short, long)]
        template: PathBuf,

        /// Path to the media manifest JSON
        #[arg(short, long)]
        manifest: PathBuf,

        /// Brand-knowledge JSON folded into field descriptions
        #[arg(short, long)]
        brand: Option<PathBuf>,

        /// Write the label-to-value JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Answer every field with a stub instead of calling the API
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Template { path, brand } => {
            commands::template::run(&path, brand.as_deref()).await?
        }
        Commands::Process {
            template,
            manifest,
            brand,
            output,
            dry_run,
        } => {
            commands::process::run(
                &template,
                &manifest,
                brand.as_deref(),
                output.as_deref(),
                dry_run,
            )
            .await?
        }
    }

    Ok(())
}
