//! Pathwatch CLI - pw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod util;

/// Pathwatch - follow a file location, even before it exists
#[derive(Parser)]
#[command(name = "pw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print events for a file location until Ctrl+C
    Watch {
        /// File to watch; it and its parent directories may not exist yet
        path: PathBuf,
        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
        /// Re-check the file every N seconds to catch missed notifications
        #[arg(long)]
        rescan_secs: Option<u64>,
        /// Exit after N events (or N bursts with --debounce-ms)
        #[arg(long)]
        max_events: Option<usize>,
        /// Coalesce bursts of events separated by less than N milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// Report a burst at the latest N milliseconds after it started (0: no bound)
        #[arg(long, default_value = "0", requires = "debounce_ms")]
        max_delay_ms: u64,
    },
    /// Load a config file and reprint it whenever it changes
    Config {
        /// YAML, TOML or JSON file
        file: PathBuf,
        /// Keep the previous config when the file becomes invalid
        #[arg(long)]
        keep_last_valid: bool,
        /// Reject unknown keys
        #[arg(long)]
        strict: bool,
        /// Debounce interval in milliseconds (0: reload on every change)
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        /// Upper bound on the debounce delay in milliseconds
        #[arg(long, default_value = "3000")]
        max_delay_ms: u64,
        /// Print the config once and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    util::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { path, json, rescan_secs, max_events, debounce_ms, max_delay_ms } => {
            let args = cmd::watch::WatchArgs {
                path,
                json,
                rescan_secs,
                max_events,
                debounce_ms,
                max_delay_ms,
            };
            cmd::watch::run(args).await
        }
        Commands::Config { file, keep_last_valid, strict, interval_ms, max_delay_ms, once } => {
            let options = reload::LoaderOptions {
                strict,
                keep_last_valid,
                debounce_interval_ms: interval_ms,
                debounce_max_delay_ms: max_delay_ms,
                format: None,
            };
            cmd::config::run(&file, options, once).await
        }
    }
}
