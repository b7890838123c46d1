//! Device HTTP client and the polling seam used by the monitor.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::device::DeviceConfig;
use crate::error::{ClientError, Result};
use crate::status::RawStatus;

/// Torch state for `/service/camera/configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorchMode {
    On,
    Off,
}

impl TorchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorchMode::On => "on",
            TorchMode::Off => "off",
        }
    }
}

/// Recorder start/stop verb for `/service/recorder/{action}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAction {
    Start,
    Stop,
}

impl RecorderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderAction::Start => "start",
            RecorderAction::Stop => "stop",
        }
    }
}

/// A fire-and-forget control call.
///
/// Devices answer control calls with an empty 200; nothing in the body is
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the camera torch on or off
    Torch(TorchMode),
    /// Select the recorder mode (e.g. `detection`)
    RecorderMode(String),
    /// Start or stop the recorder
    Recorder(RecorderAction),
}

impl Command {
    /// Recorder mode that records only while motion is detected.
    pub const DETECTION_MODE: &'static str = "detection";

    /// Path component of the request URL.
    pub fn path(&self) -> &'static str {
        match self {
            Command::Torch(_) => "/service/camera/configure",
            Command::RecorderMode(_) => "/service/recorder/configure",
            Command::Recorder(RecorderAction::Start) => "/service/recorder/start",
            Command::Recorder(RecorderAction::Stop) => "/service/recorder/stop",
        }
    }

    /// Query parameter carried by the command, if any.
    pub fn query(&self) -> Option<(&'static str, &str)> {
        match self {
            Command::Torch(mode) => Some(("torchMode", mode.as_str())),
            Command::RecorderMode(mode) => Some(("mode", mode.as_str())),
            Command::Recorder(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.query() {
            Some((key, value)) => write!(f, "{}?{}={}", self.path(), key, value),
            None => write!(f, "{}", self.path()),
        }
    }
}

/// Operations the monitor needs from a device.
///
/// `DeviceClient` is the HTTP implementation; tests substitute scripted
/// implementations to drive the polling engine deterministically.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Retrieve and decode the device's current status.
    async fn fetch_status(&self, device: &DeviceConfig) -> Result<RawStatus>;

    /// Send a control call.
    async fn send(&self, device: &DeviceConfig, command: &Command) -> Result<()>;
}

/// HTTP client for AirBeam devices
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl DeviceClient {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a new client with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Request timeout applied to every call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, device: &DeviceConfig, path: &str, query: Option<(&str, &str)>) -> Result<String> {
        let url = format!("{}{}", device.base_url(), path);

        let mut request = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .basic_auth(&device.username, Some(&device.password));
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::fetch(&device.address, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::fetch(&device.address, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::fetch(&device.address, e))
    }
}

impl Default for DeviceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceApi for DeviceClient {
    async fn fetch_status(&self, device: &DeviceConfig) -> Result<RawStatus> {
        let body = self.get(device, "/status", None).await?;
        RawStatus::from_xml(&body)
    }

    async fn send(&self, device: &DeviceConfig, command: &Command) -> Result<()> {
        debug!(device = %device.name, %command, "sending control call");
        self.get(device, command.path(), command.query()).await?;
        Ok(())
    }
}
