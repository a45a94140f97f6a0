//! Binary entrypoint for the grain frame.
//!
//! Wires the loader task to the windowed viewer, or renders a single PNG
//! snapshot when `--snapshot` is given.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use rust_grain_frame::coefficient::Coefficient;
use rust_grain_frame::config::{Configuration, ImageSource};
use rust_grain_frame::events::ImageEvent;
use rust_grain_frame::snapshot;
use rust_grain_frame::tasks::{loader, viewer};

#[derive(Debug, Parser)]
#[command(
    name = "grain-frame",
    version,
    about = "Film-grain image viewer with a live strength slider"
)]
struct Args {
    /// Path to YAML config (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Image URL or local path, overrides `image-source`
    #[arg(long = "image", value_name = "SRC")]
    image: Option<ImageSource>,
    /// Starting grain strength, clamped and snapped to the slider step
    #[arg(long = "coefficient", value_name = "F")]
    coefficient: Option<f32>,
    /// Render one grained PNG and exit without opening a window
    #[arg(long = "snapshot", value_name = "OUT")]
    snapshot: Option<PathBuf>,
    /// Side length of the snapshot canvas in pixels
    #[arg(long = "size", value_name = "PX", default_value_t = 800)]
    size: u32,
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
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("rust_grain_frame={level}").parse()?)
        .add_directive(format!("grain_frame={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("wgpu_core=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn load_configuration(path: Option<&Path>) -> Result<Configuration> {
    let cfg = match path {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        image,
        coefficient,
        snapshot,
        size,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = load_configuration(config.as_deref())?;
    if let Some(source) = image {
        cfg.image_source = source;
    }
    let mut strength = Coefficient::new(&cfg.coefficient);
    if let Some(value) = coefficient {
        strength.set(value);
    }
    tracing::debug!("effective configuration:\n{:#?}", cfg);

    if let Some(out) = snapshot {
        return run_snapshot(&cfg, strength.value(), size, out).await;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let (loaded_tx, loaded_rx) = mpsc::channel::<ImageEvent>(4); // Loader -> Viewer
    let mut tasks = JoinSet::new();
    tasks.spawn({
        let source = cfg.image_source.clone();
        let timeout = cfg.fetch_timeout;
        let cancel = cancel.clone();
        async move {
            loader::run(source, timeout, loaded_tx, cancel)
                .await
                .context("loader task failed")
        }
    });

    // The viewer owns the main thread until the window closes or cancellation occurs
    if let Err(e) =
        viewer::run_windowed(cfg, strength, loaded_rx, cancel.clone()).context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

async fn run_snapshot(cfg: &Configuration, coefficient: f32, side: u32, out: PathBuf) -> Result<()> {
    let prepared = loader::load(&cfg.image_source, cfg.fetch_timeout)
        .await
        .with_context(|| format!("failed to load {}", cfg.image_source))?;
    let image = prepared
        .into_rgba()
        .context("decoded image has inconsistent dimensions")?;
    tokio::task::spawn_blocking(move || snapshot::write_snapshot(&image, side, coefficient, &out))
        .await
        .context("snapshot task panicked")?
}
