//! Host-facing entry point
//!
//! [`AirBeamMonitor`] wires the device client, state store, event bus and
//! scheduler together and exposes the control operations a host needs
//! (torch, recorder) alongside the event subscriptions.
//!
//! Control operations naming a device that is not configured are silently
//! ignored, and `is_recording` answers `false` for it; callers should not
//! rely on an error for unknown devices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use airbeam_client::{Command, DeviceApi, DeviceClient, DeviceConfig, RecorderAction, TorchMode};
use airbeam_state::{Debouncer, StateStore};
use tracing::{debug, error};

use crate::clock::{Clock, TokioClock};
use crate::config::MonitorConfig;
use crate::coordinator::PollCoordinator;
use crate::error::{MonitorError, Result};
use crate::event::{DeviceEvent, EventBus, SubscriptionId};
use crate::scheduler::{Scheduler, SchedulerHandle};

/// How long `flash_light` keeps the torch on
pub const FLASH_DURATION: Duration = Duration::from_millis(500);

/// Monitors the configured AirBeam devices
pub struct AirBeamMonitor {
    config: MonitorConfig,
    api: Arc<dyn DeviceApi>,
    bus: EventBus,
    coordinator: Arc<PollCoordinator>,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for AirBeamMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirBeamMonitor")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("coordinator", &self.coordinator)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl AirBeamMonitor {
    /// Create a monitor talking to devices over HTTP
    pub fn new(config: MonitorConfig) -> Self {
        let api = Arc::new(DeviceClient::with_timeout(config.request_timeout()));
        Self::with_api(config, api, Arc::new(TokioClock), StateStore::new())
    }

    /// Create a monitor with an explicit device API, clock and state store
    pub fn with_api(
        mut config: MonitorConfig,
        api: Arc<dyn DeviceApi>,
        clock: Arc<dyn Clock>,
        store: StateStore,
    ) -> Self {
        config.normalize_device_names();
        let bus = EventBus::new();
        let coordinator = Arc::new(PollCoordinator::new(
            Arc::clone(&api),
            store,
            bus.clone(),
            clock,
            Debouncer::new(config.debounce_window()),
            config.layout.clone(),
        ));

        Self {
            config,
            api,
            bus,
            coordinator,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        self.coordinator.store()
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribe to one event name, e.g. `porch:motionDetected:start`
    pub fn subscribe<F>(&self, name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(name, listener)
    }

    /// Subscribe to every event from every device
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe_all(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Start polling all configured devices.
    ///
    /// Only one poll loop runs per monitor. Calling this again before the
    /// previous handle has been shut down or dropped returns
    /// `MonitorError::AlreadyRunning`.
    pub fn start(&self) -> Result<SchedulerHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MonitorError::AlreadyRunning);
        }

        let handle = Scheduler::new(
            Arc::clone(&self.coordinator),
            self.config.devices.values().cloned(),
            self.config.poll_interval(),
            self.config.overrun_policy,
        )
        .with_running_flag(Arc::clone(&self.running))
        .start();
        Ok(handle)
    }

    /// Whether a poll loop started by this monitor is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one poll cycle for a device immediately, outside the schedule.
    ///
    /// If the scheduler is polling the same device, this waits for that poll
    /// to finish first.
    ///
    /// Unlike the control operations this reports unknown devices as
    /// `MonitorError::UnknownDevice`.
    pub async fn poll_now(&self, name: &str) -> Result<Vec<DeviceEvent>> {
        let device = self.device(name)?;
        self.coordinator.poll_one(device).await
    }

    /// Last known recorder status. `false` for unknown or never-polled devices.
    pub fn is_recording(&self, name: &str) -> bool {
        match self.device(name) {
            Ok(_) => self.store().is_recording(name),
            Err(_) => false,
        }
    }

    pub async fn toggle_light(&self, name: &str, mode: TorchMode) -> Result<()> {
        self.control(name, &[Command::Torch(mode)]).await
    }

    /// Torch on, wait [`FLASH_DURATION`], torch off.
    pub async fn flash_light(&self, name: &str) -> Result<()> {
        let Some(device) = self.known_device(name) else {
            return Ok(());
        };
        self.send(device, &Command::Torch(TorchMode::On)).await?;
        tokio::time::sleep(FLASH_DURATION).await;
        self.send(device, &Command::Torch(TorchMode::Off)).await
    }

    /// Switch the recorder to motion detection mode and start it.
    pub async fn start_motion_recorder(&self, name: &str) -> Result<()> {
        self.control(
            name,
            &[
                Command::RecorderMode(Command::DETECTION_MODE.to_string()),
                Command::Recorder(RecorderAction::Start),
            ],
        )
        .await
    }

    pub async fn stop_recorder(&self, name: &str) -> Result<()> {
        self.control(name, &[Command::Recorder(RecorderAction::Stop)]).await
    }

    fn device(&self, name: &str) -> Result<&DeviceConfig> {
        self.config
            .device(name)
            .ok_or_else(|| MonitorError::UnknownDevice(name.to_string()))
    }

    fn known_device(&self, name: &str) -> Option<&DeviceConfig> {
        match self.device(name) {
            Ok(device) => Some(device),
            Err(e) => {
                debug!(error = %e, "ignoring control call");
                None
            }
        }
    }

    /// Send commands in order, stopping at the first failure.
    async fn control(&self, name: &str, commands: &[Command]) -> Result<()> {
        let Some(device) = self.known_device(name) else {
            return Ok(());
        };
        for command in commands {
            self.send(device, command).await?;
        }
        Ok(())
    }

    async fn send(&self, device: &DeviceConfig, command: &Command) -> Result<()> {
        self.api.send(device, command).await.map_err(|e| {
            error!(device = %device.name, %command, error = %e, "control call failed");
            MonitorError::from(e)
        })
    }
}
