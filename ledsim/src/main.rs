#![deny(clippy::all)]
#![deny(clippy::style)]
#![deny(clippy::print_stdout)]

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};

use ledsim::{
    config::{SimulatorConfig, SurfaceKind},
    devices::{headless::HeadlessSurface, terminal::TerminalSurface, DisplaySurfaceType, Viewport},
    effect::{
        factory::{ScriptCompiler, ScriptLimits},
        host::EffectHost,
    },
    event_loop::TickDriver,
    led::Color,
    pixel_buffer::ScaleMode,
    state::SimulationState,
    watcher::EffectWatcher,
    world::layout::Layout,
};

/// Simulates an addressable LED strip laid out on a text canvas, running a
/// hot-reloaded Rhai effect script.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Text file drawing where each LED index sits
    layout: PathBuf,

    /// Rhai script defining `effect_fn`; reloaded whenever it changes
    effect: PathBuf,

    /// Window width in pixels
    #[clap(long)]
    width: Option<usize>,

    /// Window height in pixels
    #[clap(long)]
    height: Option<usize>,

    /// JSON config file, created with defaults if missing
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Milliseconds between ticks
    #[clap(long, value_name = "MS")]
    interval: Option<u64>,

    /// nearest or linear
    #[clap(long)]
    scale: Option<ScaleMode>,

    /// Color selected at startup, as #rrggbb
    #[clap(long)]
    color: Option<Color>,

    /// Script operation budget per tick, 0 for unlimited
    #[clap(long)]
    max_operations: Option<u64>,

    /// Render to memory instead of the terminal
    #[clap(long)]
    headless: bool,

    /// Quit after this many ticks (headless only)
    #[clap(long)]
    ticks: Option<u64>,

    /// Do not reload the effect when it changes on disk
    #[clap(long)]
    no_watch: bool,

    /// Write logs here instead of stderr
    #[clap(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    let args = Args::parse();
    setup_logging(args.log_file.as_deref())?;

    let config = build_config(&args)?;

    let canvas = fs::read_to_string(&args.layout)
        .wrap_err_with(|| format!("Unable to read layout {}", args.layout.display()))?;
    let layout = Layout::parse(&canvas)
        .wrap_err_with(|| format!("Invalid layout {}", args.layout.display()))?;
    info!(
        "Layout has {} LEDs on a {}x{} canvas",
        layout.led_count(),
        layout.width(),
        layout.height()
    );

    let mut simulation = SimulationState::new(layout.led_count());
    simulation.set_current_color(config.current_color());

    let compiler = ScriptCompiler::new(ScriptLimits {
        max_operations: config.max_operations(),
        ..ScriptLimits::default()
    });
    let mut host = EffectHost::new(Box::new(compiler));
    if !host.reload_from_path(&args.effect) {
        let reason = host
            .last_load_error()
            .map(|err| err.to_string())
            .unwrap_or_default();
        return Err(eyre!("Initial effect load failed: {}", reason));
    }

    let (reload_sender, reload_receiver) = crossbeam::channel::unbounded();
    let mut watcher = if args.no_watch {
        None
    } else {
        Some(EffectWatcher::start(&args.effect, reload_sender)?)
    };

    let viewport = Viewport::new(
        config.window_width(),
        config.window_height(),
        config.scale_mode(),
    );
    let surface: DisplaySurfaceType = match config.surface() {
        SurfaceKind::Terminal => {
            if args.log_file.is_none() {
                warn!("Logging to stderr while drawing to the terminal, consider --log-file");
            }
            TerminalSurface::new(viewport)?.into()
        }
        SurfaceKind::Headless => HeadlessSurface::new(viewport, args.ticks).into(),
    };

    let mut driver = TickDriver::new(
        layout,
        host,
        simulation,
        surface,
        reload_receiver,
        config.tick_interval_ms(),
    );

    let result = driver.run().await;

    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }
    // Restores the terminal before any report is printed.
    drop(driver);

    result?;
    Ok(())
}

fn build_config(args: &Args) -> Result<SimulatorConfig, Report> {
    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load_or_create(path)
            .wrap_err_with(|| format!("Unable to load config {}", path.display()))?,
        None => SimulatorConfig::default(),
    };

    config.set_window_size(args.width, args.height);
    if let Some(interval) = args.interval {
        config.set_tick_interval_ms(interval);
    }
    if let Some(scale) = args.scale {
        config.set_scale_mode(scale);
    }
    if let Some(color) = args.color {
        config.set_current_color(color);
    }
    if let Some(max_operations) = args.max_operations {
        config.set_max_operations(max_operations);
    }
    if args.headless {
        config.set_surface(SurfaceKind::Headless);
    }

    Ok(config)
}

fn setup_logging(log_file: Option<&Path>) -> Result<(), Report> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }
    color_eyre::install()?;

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "ledsim=info");
    }

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = File::create(path)
            .wrap_err_with(|| format!("Unable to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();

    Ok(())
}
