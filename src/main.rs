//! Binary entrypoint for auto-slideshow.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use auto_slideshow::config::Configuration;
use auto_slideshow::render::viewer;
use auto_slideshow::scan::{DirectoryStore, MediaStore};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "auto-slideshow",
    version,
    about = "Cycle through a photo library by hand or on a timer"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Photo library directory (overrides photo-library-path)
    #[arg(short, long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Slideshow period, e.g. "2s" or "1500ms" (overrides slideshow-interval)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Print the collection order without opening a window
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("auto_slideshow={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let base = match (&cli.config, &cli.library) {
        (Some(path), _) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        (None, Some(library)) => Configuration::for_library(library),
        (None, None) => bail!("either --config or --library is required"),
    };
    base.with_overrides(cli.library.clone(), cli.interval)
        .validated()
        .context("validating configuration")
}

fn print_collection(cfg: &Configuration) -> Result<()> {
    let store = DirectoryStore::new(&cfg.photo_library_path, cfg.scan_options());
    let entries = store
        .query()
        .with_context(|| format!("scanning {}", cfg.photo_library_path.display()))?;

    println!(
        "# collection: {}\n# images: {}\n",
        cfg.photo_library_path.display(),
        entries.len()
    );
    if entries.is_empty() {
        println!("(no images found)");
    }
    for entry in &entries {
        println!("  {:>4}: {}", entry.id, entry.display_uri());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    info!(?cfg, "configuration loaded");

    if cli.list {
        return print_collection(&cfg);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // The window owns the main thread until it closes or cancellation fires.
    viewer::run_windowed(cfg, cancel.clone()).context("viewer failed")?;
    cancel.cancel();
    Ok(())
}
