//! # airbeam-monitor
//!
//! Polls a fleet of AirBeam camera apps and turns their noisy detector
//! fields into debounced events.
//!
//! Every poll interval the [`Scheduler`] fans out to all configured devices
//! at once. For each device the [`PollCoordinator`] fetches `/status`, runs
//! the tracked detector fields through the debouncer, stores the new
//! [`DeviceState`](airbeam_state::DeviceState) and publishes events on the
//! [`EventBus`]:
//!
//! - `<device>:<property>:start` / `<device>:<property>:stop` for debounced
//!   detector transitions
//! - `<device>:<level>:update` with a two-decimal percentage on every
//!   successful poll
//!
//! A device that cannot be reached simply produces no events until it
//! answers again; it never affects the other devices.
//!
//! ```rust,ignore
//! use airbeam_monitor::{AirBeamMonitor, MonitorConfig};
//!
//! let config = MonitorConfig::from_file("airbeam.json")?;
//! let monitor = AirBeamMonitor::new(config);
//!
//! monitor.subscribe("porch:motionDetected:start", |event| {
//!     println!("motion on {}", event.device);
//! });
//!
//! let handle = monitor.start()?;
//! // ...
//! handle.shutdown().await;
//! ```

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod scheduler;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{MonitorConfig, OverrunPolicy, StatusLayout};
pub use coordinator::{format_level, PollCoordinator};
pub use error::{ConfigError, MonitorError, Result};
pub use event::{DeviceEvent, EventBus, EventKind, SubscriptionId};
pub use monitor::AirBeamMonitor;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};

// Re-exported so hosts need only this crate.
pub use airbeam_client::{ClientError, Command, DeviceApi, DeviceClient, DeviceConfig, RawStatus, TorchMode};
pub use airbeam_state::{DeviceState, StateStore};
