// SPDX-License-Identifier: GPL-3.0-only

use camera_identify::{CaptureSource, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

mod cli;

#[derive(Parser)]
#[command(name = "camera-identify")]
#[command(about = "Identify objects in front of the camera")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/camera-identify/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Classifier server base URL
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Camera device, image directory or image file
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Milliseconds between captures
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in the terminal (renders camera and label to the terminal)
    Run,

    /// Run without a UI, printing each new label
    Headless,

    /// Identify a single image file
    Identify {
        /// Image to send
        image: PathBuf,
    },

    /// List available cameras
    List,

    /// Check that the classifier server is reachable
    Ping,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Run));

    init_logging(interactive);
    info!(version = env!("GIT_VERSION"), "Starting camera-identify");

    if let Some(Commands::List) = cli.command {
        return cli::list_cameras();
    }

    let config = load_config(&cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        None | Some(Commands::Run) => camera_identify::terminal::run(&runtime, &config),
        Some(Commands::Headless) => runtime.block_on(cli::run_headless(&config)),
        Some(Commands::Identify { image }) => runtime.block_on(cli::identify_file(&config, &image)),
        Some(Commands::Ping) => runtime.block_on(cli::ping(&config)),
        Some(Commands::List) => cli::list_cameras(),
    }
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(source) = &cli.source {
        config.source = CaptureSource::from_path_hint(source);
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.capture_interval_ms = interval_ms;
    }

    config.validate()?;
    Ok(config)
}

/// Initialize logging
///
/// Set RUST_LOG environment variable to control log level
/// Examples: RUST_LOG=debug, RUST_LOG=camera_identify=debug, RUST_LOG=info
///
/// The terminal UI owns the screen, so it logs to a file in the cache
/// directory instead of stderr.
fn init_logging(interactive: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if !interactive {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    match open_log_file() {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("camera-identify");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("camera-identify.log"))
        .ok()
}
