//! Print location events for a path

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::{cancel_pair, debounce, FileInfo, LocationEvent, LocationWatcher, WatchOptions};

use crate::util;

pub struct WatchArgs {
    pub path: PathBuf,
    pub json: bool,
    pub rescan_secs: Option<u64>,
    pub max_events: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub max_delay_ms: u64,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let options = WatchOptions {
        rescan_interval_ms: args.rescan_secs.map(|secs| secs.saturating_mul(1000)),
        ..WatchOptions::default()
    };

    let (canceller, signal) = cancel_pair();
    let watcher = LocationWatcher::with_options(&args.path, Some(signal), options)
        .with_context(|| format!("Failed to watch {}", args.path.display()))?;

    if !args.json {
        eprintln!("{} {}", "Watching".dimmed(), watcher.target().display().to_string().cyan());
    }

    // The watcher API is blocking; keep it off the async workers
    let printer = tokio::task::spawn_blocking(move || print_events(&watcher, &args));

    tokio::select! {
        res = printer => res.context("Event printer failed")?,
        _ = tokio::signal::ctrl_c() => {
            canceller.cancel();
            Ok(())
        }
    }
}

fn print_events(watcher: &LocationWatcher, args: &WatchArgs) -> Result<()> {
    let limit = args.max_events.unwrap_or(usize::MAX);
    if limit == 0 {
        return Ok(());
    }

    match args.debounce_ms {
        None => {
            for (n, event) in watcher.events().iter().enumerate() {
                print_event(watcher.target(), event, watcher.info().as_ref(), args.json)?;
                if n + 1 >= limit {
                    break;
                }
            }
        }
        Some(interval_ms) => {
            let bursts = debounce_events(
                watcher.events().clone(),
                Duration::from_millis(interval_ms),
                Duration::from_millis(args.max_delay_ms),
            )?;
            for (n, count) in bursts.iter().enumerate() {
                print_burst(watcher.target(), count, watcher.info().as_ref(), args.json)?;
                if n + 1 >= limit {
                    break;
                }
            }
        }
    }

    watcher.close();
    Ok(())
}

/// Feed watcher events into a counting debounce stage
fn debounce_events(
    events: Receiver<LocationEvent>,
    interval: Duration,
    max_delay: Duration,
) -> Result<Receiver<usize>> {
    let (input, bursts) =
        debounce::counted(interval, max_delay).context("Failed to start debounce stage")?;

    std::thread::Builder::new()
        .name("pw-debounce-feed".to_string())
        .spawn(move || {
            for _ in events.iter() {
                if input.send(()).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start debounce feed")?;

    Ok(bursts)
}

fn print_event(target: &Path, event: LocationEvent, info: Option<&FileInfo>, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({
            "event": event,
            "path": target,
            "size": info.map(FileInfo::len),
        });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    let label = match event {
        LocationEvent::Created => format!("{:<8}", event).green().to_string(),
        LocationEvent::Updated => format!("{:<8}", event).yellow().to_string(),
        LocationEvent::Deleted => format!("{:<8}", event).red().to_string(),
    };
    match info {
        Some(info) if event != LocationEvent::Deleted => println!(
            "{} {} {}",
            label,
            target.display(),
            format!("({})", util::format_size(info.len())).dimmed()
        ),
        _ => println!("{} {}", label, target.display()),
    }
    Ok(())
}

fn print_burst(target: &Path, count: usize, info: Option<&FileInfo>, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({
            "changes": count,
            "path": target,
            "size": info.map(FileInfo::len),
        });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    let state = match info {
        Some(info) => util::format_size(info.len()),
        None => "absent".to_string(),
    };
    println!(
        "{} {} {}",
        format!("{count} change(s)").yellow(),
        target.display(),
        format!("({state})").dimmed()
    );
    Ok(())
}
