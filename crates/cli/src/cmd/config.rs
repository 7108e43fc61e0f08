//! Load a config file and follow its changes

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use reload::{ConfigLoader, LoaderOptions, ReloadError};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub async fn run(file: &Path, options: LoaderOptions, once: bool) -> Result<()> {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);

    let loader = ConfigLoader::builder(file, Value::Object(Map::new()))
        .options(options)
        .on_error(move |e: &ReloadError| {
            eprintln!("{} {e}", "error:".red().bold());
            sink.lock().push(e.to_string());
        })
        .on_reload(|config: &Value| {
            eprintln!("{}", "Reloaded".green());
            if let Err(e) = print_config(config) {
                eprintln!("{} {e}", "error:".red().bold());
            }
        })
        .build()
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if once {
        if let Some(failure) = failures.lock().first() {
            anyhow::bail!("Failed to load {}: {failure}", file.display());
        }
        return print_config(&loader.get());
    }

    eprintln!(
        "{} {} {}",
        "Following".dimmed(),
        loader.path().display().to_string().cyan(),
        format!("({})", loader.format()).dimmed()
    );
    print_config(&loader.get())?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    loader.close();

    Ok(())
}

fn print_config(config: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
