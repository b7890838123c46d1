//! `airbeam` - watch AirBeam cameras and control their torch and recorder.
//!
//! ```text
//! airbeam --config airbeam.json watch
//! airbeam --config airbeam.json flash porch
//! airbeam --config airbeam.json record porch
//! ```

use std::path::PathBuf;

use airbeam_monitor::logging::{self, LoggingMode};
use airbeam_monitor::{AirBeamMonitor, MonitorConfig, TorchMode};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "airbeam", version, about = "Monitor AirBeam cameras for motion and sound")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "airbeam.json")]
    config: PathBuf,

    /// Log output mode (overrides AIRBEAM_LOG_MODE)
    #[arg(long, value_enum)]
    log_mode: Option<LogModeArg>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Poll all devices and print events until interrupted (default)
    Watch {
        /// Only print start/stop events, not level updates
        #[arg(long)]
        transitions_only: bool,
    },
    /// Poll one device once and print the resulting events
    Status { device: String },
    /// Switch a device's torch on or off
    Light { device: String, state: LightState },
    /// Pulse a device's torch
    Flash { device: String },
    /// Start the motion-detection recorder
    Record { device: String },
    /// Stop the recorder
    Stop { device: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LightState {
    On,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogModeArg {
    Silent,
    Development,
    Debug,
    Json,
}

impl From<LogModeArg> for LoggingMode {
    fn from(arg: LogModeArg) -> Self {
        match arg {
            LogModeArg::Silent => LoggingMode::Silent,
            LogModeArg::Development => LoggingMode::Development,
            LogModeArg::Debug => LoggingMode::Debug,
            LogModeArg::Json => LoggingMode::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.log_mode {
        Some(mode) => logging::init_logging(mode.into())?,
        None => logging::init_logging_from_env()?,
    }

    let config = MonitorConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let monitor = AirBeamMonitor::new(config);

    match cli.command.unwrap_or(CliCommand::Watch { transitions_only: false }) {
        CliCommand::Watch { transitions_only } => watch(&monitor, transitions_only).await,
        CliCommand::Status { device } => {
            ensure_known(&monitor, &device)?;
            for event in monitor.poll_now(&device).await? {
                println!("{}", event);
            }
            println!("{}:recording {}", device, monitor.is_recording(&device));
            Ok(())
        }
        CliCommand::Light { device, state } => {
            ensure_known(&monitor, &device)?;
            let mode = match state {
                LightState::On => TorchMode::On,
                LightState::Off => TorchMode::Off,
            };
            Ok(monitor.toggle_light(&device, mode).await?)
        }
        CliCommand::Flash { device } => {
            ensure_known(&monitor, &device)?;
            Ok(monitor.flash_light(&device).await?)
        }
        CliCommand::Record { device } => {
            ensure_known(&monitor, &device)?;
            Ok(monitor.start_motion_recorder(&device).await?)
        }
        CliCommand::Stop { device } => {
            ensure_known(&monitor, &device)?;
            Ok(monitor.stop_recorder(&device).await?)
        }
    }
}

/// The library ignores unknown devices; on the command line that is a typo.
fn ensure_known(monitor: &AirBeamMonitor, device: &str) -> Result<()> {
    if monitor.config().device(device).is_none() {
        let known: Vec<&str> = monitor.config().devices.keys().map(String::as_str).collect();
        bail!("unknown device {:?} (configured: {})", device, known.join(", "));
    }
    Ok(())
}

async fn watch(monitor: &AirBeamMonitor, transitions_only: bool) -> Result<()> {
    if monitor.config().devices.is_empty() {
        bail!("no devices configured");
    }

    // Listeners run on poll tasks; hand events to this task for printing.
    let (tx, mut rx) = mpsc::unbounded_channel();
    monitor.subscribe_all(move |event| {
        if transitions_only && event.payload().is_some() {
            return;
        }
        let _ = tx.send(event.clone());
    });

    let handle = monitor.start()?;
    info!(
        devices = monitor.config().devices.len(),
        "watching; press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            Some(event) = rx.recv() => println!("{}", event),
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                break;
            }
        }
    }

    info!(
        stats = %handle.stats(),
        reporting = ?monitor.store().device_names(),
        "stopping"
    );
    handle.shutdown().await;
    Ok(())
}
