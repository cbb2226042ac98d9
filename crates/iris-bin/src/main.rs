//! iris entrypoint.

use anyhow::Result;
use clap::Parser;
use core_events::{Event, event_channel};
use core_list::FsMonitor;
use iris::app::{App, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments. Options override the config file.
#[derive(Parser, Debug)]
#[command(name = "iris", version, about = "Image viewer")]
struct Args {
    /// Files and directories to open; `-` reads stdin, `exec://CMD` decodes
    /// the stdout of a shell command.
    sources: Vec<String>,
    /// Configuration file path (overrides discovery of `iris.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Entry ordering: none, alpha, numeric, mtime, size, random.
    #[arg(long)]
    order: Option<String>,
    #[arg(long)]
    reverse: bool,
    /// Recurse into directories.
    #[arg(long, short = 'r')]
    recursive: bool,
    /// Stop at the list ends instead of wrapping.
    #[arg(long)]
    no_loop: bool,
    /// Preload cache capacity.
    #[arg(long)]
    preload: Option<usize>,
    /// History cache capacity.
    #[arg(long)]
    history: Option<usize>,
    /// Initial scale mode.
    #[arg(long)]
    scale: Option<String>,
    /// Initial position mode.
    #[arg(long)]
    position: Option<String>,
    /// Antialiasing filter.
    #[arg(long)]
    aa: Option<String>,
    /// Slideshow interval in seconds.
    #[arg(long)]
    slideshow: Option<u64>,
    /// Window size as WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720")]
    window: String,
    /// Start in gallery mode.
    #[arg(long, short = 'g')]
    gallery: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    match run(args) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("iris: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(".", "iris.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
        .ok()
        .map(|_| guard)
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

fn parse_window(raw: &str) -> Option<(usize, usize)> {
    let (w, h) = raw.split_once('x')?;
    let (w, h) = (w.parse().ok()?, h.parse().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

/// Fold CLI overrides into the config-derived settings.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(order) = &args.order {
        match order.parse() {
            Ok(order) => settings.list.order = order,
            Err(()) => warn!(target: "config", value = order.as_str(), "invalid --order ignored"),
        }
    }
    if args.reverse {
        settings.list.reverse = true;
    }
    if args.recursive {
        settings.list.recursive = true;
    }
    if args.no_loop {
        settings.list.wrap = false;
    }
    if let Some(preload) = args.preload {
        settings.preload = preload;
    }
    if let Some(history) = args.history {
        settings.history = history;
    }
    if let Some(scale) = &args.scale {
        match scale.parse() {
            Ok(mode) => settings.viewport.scale_mode = mode,
            Err(()) => warn!(target: "config", value = scale.as_str(), "invalid --scale ignored"),
        }
    }
    if let Some(position) = &args.position {
        match position.parse() {
            Ok(mode) => settings.viewport.position_mode = mode,
            Err(()) => {
                warn!(target: "config", value = position.as_str(), "invalid --position ignored")
            }
        }
    }
    if let Some(aa) = &args.aa {
        match aa.parse() {
            Ok(filter) => settings.viewport.aa = filter,
            Err(()) => warn!(target: "config", value = aa.as_str(), "invalid --aa ignored"),
        }
    }
    if let Some(seconds) = args.slideshow {
        if seconds > 0 {
            settings.slideshow = std::time::Duration::from_secs(seconds);
        } else {
            warn!(target: "config", "invalid --slideshow ignored");
        }
    }
}

/// Read `;`-delimited action sequences from stdin, one line each. This is
/// the same surface a request socket would enqueue through.
fn spawn_stdin_actions(tx: tokio::sync::mpsc::Sender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match core_actions::parse_sequence(line) {
                Ok(seq) => {
                    if tx.send(Event::Action(seq)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(target: "runtime.input", error = %e, "bad action line"),
            }
        }
    })
}

#[tokio::main]
async fn run(args: Args) -> Result<i32> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let Some(window) = parse_window(&args.window) else {
        eprintln!("iris: invalid --window `{}` (expected WIDTHxHEIGHT)", args.window);
        return Ok(1);
    };
    if args.sources.is_empty() {
        eprintln!("iris: no sources given");
        return Ok(1);
    }

    let config = core_config::load_from(args.config.clone())?;
    let mut settings = Settings::from_config(&config.file);
    apply_overrides(&mut settings, &args);

    let (tx, mut rx) = event_channel();
    let mut app = App::new(settings, &args.sources, window, tx.clone())?;
    if app.list.is_empty() {
        eprintln!("iris: nothing to show");
        return Ok(2);
    }

    // Live directory monitoring; carries on without it if the OS watcher
    // cannot start.
    let _monitor = match FsMonitor::start(&app.list) {
        Ok(monitor) => {
            monitor.watch_list(&app.list);
            Some(monitor)
        }
        Err(e) => {
            error!(target: "runtime", error = %e, "filesystem monitor unavailable");
            None
        }
    };

    if !app.open_first() {
        eprintln!("iris: no image could be opened");
        return Ok(2);
    }
    if args.gallery {
        app.enter_gallery();
    }

    let _stdin_task = spawn_stdin_actions(tx);
    let code = app.pump(&mut rx).await;
    Ok(code)
}
