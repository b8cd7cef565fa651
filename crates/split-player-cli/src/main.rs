//! Split Player CLI - Headless split player driver
//!
//! Features:
//! - Configuration validation
//! - Scripted playback sessions against the simulated backend
//! - Transition records as text, tables or JSON lines

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod progress;
mod script;

/// Split Player CLI - Synchronized video embed toolkit
#[derive(Parser)]
#[command(name = "split-player")]
#[command(version)]
#[command(about = "Check split player configurations and simulate playback", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a player configuration file
    Check {
        /// Path to the JSON configuration
        config: PathBuf,
    },

    /// Run a playback script against simulated embeds
    Simulate {
        /// Path to the JSON configuration
        config: PathBuf,

        /// Script with one step per line
        #[arg(short, long)]
        script: PathBuf,

        /// Native duration of a video, as ID=SECONDS (repeatable)
        #[arg(short, long = "duration", value_name = "ID=SECONDS")]
        durations: Vec<String>,

        /// Embeds stay initializing until a `ready` step
        #[arg(long)]
        manual_ready: bool,

        /// Draw the shared timeline as a progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// List registered hosting backends
    Backends,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    split_player_core::init();

    match cli.command {
        Commands::Check { config } => {
            commands::check(&config, &cli.format)?;
        }
        Commands::Simulate {
            config,
            script,
            durations,
            manual_ready,
            progress,
        } => {
            let options = commands::SimulateOptions {
                durations,
                manual_ready,
                progress,
            };
            commands::simulate(&config, &script, options, &cli.format).await?;
        }
        Commands::Backends => {
            let registry = split_player_core::BackendRegistry::with_defaults();
            for id in registry.ids() {
                println!("{}", id);
            }
        }
    }

    Ok(())
}
