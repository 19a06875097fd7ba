//! Gridlight entrypoint: replays recorded redraw notifications against a
//! document held in memory and prints the overlays that result.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, load_from};
use core_dispatch::HighlightManager;
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry, GridId};
use core_model::memory::{MemoryAccessor, MemoryEditor, MemoryViewport};
use core_model::{GridOffset, Viewport};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod replay;
mod report;

use replay::ReplaySource;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "gridlight", version, about = "Replay redraw events into editor overlays")]
struct Args {
    /// Document shown in the grid (UTF-8 text).
    #[arg(long)]
    doc: PathBuf,
    /// Recorded redraw notifications, one JSON notification per line.
    #[arg(long)]
    events: PathBuf,
    /// Grid id the document is displayed in.
    #[arg(long, default_value_t = 2)]
    grid: GridId,
    #[arg(long = "tab-size", default_value_t = 8)]
    tab_size: usize,
    /// Optional configuration file path (overrides discovery of `gridlight.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self, config: &Config) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("gridlight.log");
        // Reported once the subscriber is up.
        let stale = remove_stale_log(&log_path);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.log_filter()))
            .context("invalid log filter")?;
        let file_appender = tracing_appender::rolling::never(log_dir, "gridlight.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
                if let Err(err) = stale {
                    warn!(target: "runtime.startup", path = %log_path.display(), %err, "stale_log_not_removed");
                }
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// Remove the previous run's log. A missing file is not an error.
fn remove_stale_log(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

async fn join_sources(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        match tokio::time::timeout(Duration::from_millis(200), handle).await {
            Ok(Ok(())) => trace!(target: "runtime.shutdown", "event_source_task_stopped"),
            Ok(Err(err)) => error!(target: "runtime.shutdown", ?err, "event_source_task_error"),
            Err(_) => warn!(target: "runtime.shutdown", "event_source_task_timeout"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let mut startup = AppStartup::new();
    startup.configure_logging(&config)?;
    AppStartup::install_panic_hook();

    let text = std::fs::read_to_string(&args.doc)
        .with_context(|| format!("reading document {}", args.doc.display()))?;
    let events = std::fs::read_to_string(&args.events)
        .with_context(|| format!("reading events {}", args.events.display()))?;

    let editor = Arc::new(MemoryEditor::new(&text, args.tab_size));
    let line_count = text.lines().count();
    let viewport = Arc::new(MemoryViewport::new());
    viewport.set(
        args.grid,
        Viewport::new(0, line_count.saturating_sub(1) as i64),
        GridOffset::default(),
    );
    let accessor = Arc::new(MemoryAccessor::new());
    accessor.attach(args.grid, Arc::clone(&editor));

    info!(
        target: "runtime.startup",
        doc = %args.doc.display(),
        lines = line_count,
        grid = args.grid,
        tab_size = args.tab_size,
        config = config.path.as_ref().map(|p| p.display().to_string()).as_deref(),
        "bootstrap_complete"
    );

    let manager = HighlightManager::new(config.highlight(), viewport, accessor);
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut sources = EventSourceRegistry::new();
    sources.register(ReplaySource::new(&events));
    let handles = sources.spawn_all(&tx);
    drop(tx);

    let stats = manager.run(rx).await;
    join_sources(handles).await;

    print!("{}", report::render_overlays(&editor));
    let snap = manager.metrics().snapshot();
    println!("{}", report::render_metrics(&snap));
    info!(
        target: "runtime.shutdown",
        batches = stats.batches,
        flushes = stats.flushes,
        flush_failures = stats.flush_failures,
        "replay_complete"
    );
    Ok(())
}
