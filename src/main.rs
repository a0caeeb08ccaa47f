//! `landfall-cam`: drive the cameras listed in a Landfall config from a shell.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::{FutureExt, StreamExt};
use landfall_camera::config::{Settings, DEFAULT_CONFIG_PATH};
use landfall_camera::logging::{init_tracing, validate_level};
use landfall_camera::manager::{CameraManager, TaggedEvent};
use landfall_camera::{CameraEvent, DriverRegistry, SlateMetadata};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "landfall-cam")]
#[command(about = "Connect, monitor, slate and roll Landfall cameras")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered drivers
    Drivers,

    /// Connect every enabled camera and print its notifications
    Monitor {
        /// How long to watch
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },

    /// Inject a slate into every connected camera
    Slate {
        /// Scene, e.g. 12A
        #[arg(long)]
        scene: String,

        /// Take number
        #[arg(long)]
        take: u64,

        /// Production name
        #[arg(long)]
        production: Option<String>,

        /// Shoot date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        /// Extra slate field as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Record on every camera for a fixed time
    Record {
        /// Recording duration in seconds
        #[arg(short, long)]
        seconds: u64,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.application.log_level.clone());
    validate_level(&level)?;
    init_tracing(&level, settings.log_format());

    let registry = DriverRegistry::with_builtin()?;
    if let Commands::Drivers = cli.command {
        for name in registry.driver_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let manager = CameraManager::from_settings(&settings, &registry)?;
    if manager.is_empty() {
        bail!("no enabled cameras in {}", cli.config.display());
    }
    info!(app = %settings.application.name, cameras = ?manager.ids(), "Starting");

    match cli.command {
        Commands::Drivers => Ok(()),
        Commands::Monitor { seconds } => monitor(&manager, Duration::from_secs(seconds)).await,
        Commands::Slate {
            scene,
            take,
            production,
            date,
            fields,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let mut builder = SlateMetadata::builder()
                .scene(&scene)
                .take(take)
                .shoot_date(date);
            if let Some(production) = production.as_deref() {
                builder = builder.production(production);
            }
            for (key, value) in &fields {
                builder = builder.field(key, value.as_str());
            }
            slate(&manager, builder.build()).await
        }
        Commands::Record { seconds } => record(&manager, Duration::from_secs(seconds)).await,
    }
}

async fn connect(manager: &CameraManager) -> Result<()> {
    let report = manager.connect_all().await;
    for id in &report.connected {
        println!("{:<12} connected", id);
    }
    for (id, error) in &report.failed {
        println!("{:<12} FAILED: {}", id, error);
    }
    if report.connected.is_empty() {
        bail!("no camera connected");
    }
    Ok(())
}

fn print_event(tagged: &TaggedEvent) {
    match &tagged.event {
        CameraEvent::StateChanged(state) => println!(
            "{:<12} rec={} iso={} shutter={} iris={} wb={} battery={} lens={}",
            tagged.camera_id,
            state.recording,
            state.iso,
            state.shutter,
            state.iris,
            state.white_balance,
            state
                .battery()
                .map(|v| format!("{:.2}V", v))
                .unwrap_or_else(|| "N/A".into()),
            state.lens_info
        ),
        CameraEvent::ConnectionStatus(status) => println!("{:<12} {}", tagged.camera_id, status),
    }
}

async fn monitor(manager: &CameraManager, duration: Duration) -> Result<()> {
    let mut events = manager.subscribe_all();
    let result = connect(manager).await;

    if result.is_ok() {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = tokio::signal::ctrl_c() => break,
                event = events.next() => match event {
                    Some(event) => print_event(&event),
                    None => break,
                },
            }
        }
    }

    manager.disconnect_all().await;
    while let Some(Some(event)) = events.next().now_or_never() {
        print_event(&event);
    }
    result
}

async fn slate(manager: &CameraManager, metadata: SlateMetadata) -> Result<()> {
    metadata.validate()?;
    let result = match connect(manager).await {
        Ok(()) => manager
            .inject_metadata_all(&metadata)
            .await
            .context("slate injection failed"),
        Err(e) => Err(e),
    };
    manager.disconnect_all().await;
    if result.is_ok() {
        println!("Slated {} field(s)", metadata.len());
    }
    result
}

async fn record(manager: &CameraManager, duration: Duration) -> Result<()> {
    let result = async {
        connect(manager).await?;
        manager.start_record_all().await.context("start recording")?;
        println!("Rolling for {}s (Ctrl-C to cut)", duration.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = tokio::signal::ctrl_c() => println!("Cut"),
        }
        manager.stop_record_all().await.context("stop recording")
    }
    .await;

    manager.disconnect_all().await;
    result
}
