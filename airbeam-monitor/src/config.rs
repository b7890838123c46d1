//! Configuration types for the monitor
//!
//! The on-disk format is JSON:
//!
//! ```json
//! {
//!   "pollInterval": 1000,
//!   "devices": {
//!     "porch": { "ip": "192.168.1.20:8080", "password": "secret" },
//!     "garage": { "ip": "192.168.1.21:8080", "password": "secret" }
//!   }
//! }
//! ```
//!
//! Only `devices` is required. Device names come from the map keys.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use airbeam_client::DeviceConfig;
use airbeam_state::DEFAULT_WINDOW;
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// What to do when a tick fires while the previous poll of the same device
/// is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrunPolicy {
    /// Skip the device for this tick
    #[default]
    Skip,
    /// Wait for the previous poll, then run
    Queue,
}

/// Names of the status fields the monitor reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusLayout {
    /// Boolean-like detector fields, debounced in this order
    pub tracked: Vec<String>,
    /// Fractional level fields reported as percentages every poll
    pub levels: Vec<String>,
    /// Recorder mode field
    pub mode_field: String,
    /// Mode value meaning the recorder is not running
    pub idle_value: String,
}

impl Default for StatusLayout {
    fn default() -> Self {
        Self {
            tracked: vec!["audioDetected".to_string(), "motionDetected".to_string()],
            levels: vec!["audioLevel".to_string(), "motionLevel".to_string()],
            mode_field: "state".to_string(),
            idle_value: "idle".to_string(),
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Devices to monitor, keyed by name
    #[serde(default, deserialize_with = "devices_named_by_key")]
    pub devices: BTreeMap<String, DeviceConfig>,

    /// Poll interval in milliseconds
    /// Default: 1000 (also used when 0)
    #[serde(default)]
    pub poll_interval: Option<u64>,

    /// Debounce window in milliseconds
    /// Default: 5000
    #[serde(default)]
    pub debounce_ms: Option<u64>,

    /// Upper bound for a single device request in milliseconds.
    /// Never exceeds the poll interval.
    /// Default: 5000
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Default: skip
    #[serde(default)]
    pub overrun_policy: OverrunPolicy,

    #[serde(default)]
    pub layout: StatusLayout,
}

/// Device names always come from the map keys.
fn devices_named_by_key<'de, D>(deserializer: D) -> Result<BTreeMap<String, DeviceConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut devices = BTreeMap::<String, DeviceConfig>::deserialize(deserializer)?;
    name_by_key(&mut devices);
    Ok(devices)
}

fn name_by_key(devices: &mut BTreeMap<String, DeviceConfig>) {
    for (name, device) in devices.iter_mut() {
        if device.name != *name {
            device.name = name.clone();
        }
    }
}

impl MonitorConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Create an empty configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Make every device's name match its key in `devices`.
    ///
    /// Only needed after editing `devices` by hand; deserialisation and
    /// [`with_device`](Self::with_device) keep names in step already.
    pub fn normalize_device_names(&mut self) {
        name_by_key(&mut self.devices);
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Add a device, keyed by its name.
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.insert(device.name.clone(), device);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval.as_millis() as u64);
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_ms = Some(window.as_millis() as u64);
        self
    }

    pub fn with_overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.overrun_policy = policy;
        self
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.get(name)
    }

    /// Effective poll interval
    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Effective debounce window
    pub fn debounce_window(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WINDOW)
    }

    /// Effective request timeout, capped at the poll interval
    pub fn request_timeout(&self) -> Duration {
        let requested = match self.request_timeout_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Self::DEFAULT_REQUEST_TIMEOUT,
        };
        requested.min(self.poll_interval())
    }

    /// Check the configuration for values the monitor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, device) in &self.devices {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("device name must not be empty".to_string()));
            }
            if device.address.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("device {} has no address", name)));
            }
        }
        if self.layout.mode_field.is_empty() {
            return Err(ConfigError::Invalid("layout.modeField must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CONFIG_JSON: &str = r#"{
        "pollInterval": 250,
        "devices": {
            "porch": { "ip": "192.168.1.20:8080", "password": "secret" },
            "garage": { "address": "192.168.1.21", "username": "admin", "password": "hunter2" }
        }
    }"#;

    #[test]
    fn test_from_json_str() {
        let config = MonitorConfig::from_json_str(CONFIG_JSON).unwrap();

        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));

        let porch = config.device("porch").unwrap();
        assert_eq!(porch.name, "porch");
        assert_eq!(porch.address, "192.168.1.20:8080");
        assert_eq!(porch.username, "user");

        let garage = config.device("garage").unwrap();
        assert_eq!(garage.name, "garage");
        assert_eq!(garage.username, "admin");

        assert_eq!(config.layout, StatusLayout::default());
        assert_eq!(config.overrun_policy, OverrunPolicy::Skip);
        assert!(config.device("ghost-device").is_none());
    }

    #[test]
    fn test_plain_deserialize_names_devices_by_key() {
        let json = r#"{
            "devices": {
                "porch": { "ip": "10.0.0.5", "password": "secret" },
                "garage": { "name": "shed", "ip": "10.0.0.6", "password": "secret" }
            }
        }"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.device("porch").unwrap().name, "porch");
        assert_eq!(config.device("garage").unwrap().name, "garage");
    }

    #[test]
    fn test_normalize_device_names() {
        let mut config = MonitorConfig::new();
        config
            .devices
            .insert("porch".to_string(), DeviceConfig::new("", "10.0.0.5", "secret"));

        config.normalize_device_names();
        assert_eq!(config.device("porch").unwrap().name, "porch");
    }

    #[rstest]
    #[case(r#"{"devices": {}}"#, 1000)]
    #[case(r#"{"devices": {}, "pollInterval": 0}"#, 1000)]
    #[case(r#"{"devices": {}, "pollInterval": 2500}"#, 2500)]
    fn test_poll_interval_default(#[case] json: &str, #[case] expected_ms: u64) {
        let config = MonitorConfig::from_json_str(json).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(expected_ms));
    }

    #[test]
    fn test_request_timeout_capped_by_poll_interval() {
        let config = MonitorConfig::new();
        assert_eq!(config.request_timeout(), Duration::from_millis(1000));

        let config = MonitorConfig::new().with_poll_interval(Duration::from_secs(10));
        assert_eq!(config.request_timeout(), MonitorConfig::DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_overrides() {
        let json = r#"{
            "devices": {},
            "debounceMs": 1500,
            "overrunPolicy": "queue",
            "layout": { "tracked": ["motionDetected"], "levels": [] }
        }"#;
        let config = MonitorConfig::from_json_str(json).unwrap();

        assert_eq!(config.debounce_window(), Duration::from_millis(1500));
        assert_eq!(config.overrun_policy, OverrunPolicy::Queue);
        assert_eq!(config.layout.tracked, vec!["motionDetected".to_string()]);
        assert!(config.layout.levels.is_empty());
        assert_eq!(config.layout.mode_field, "state");
    }

    #[test]
    fn test_validation_errors() {
        let result = MonitorConfig::from_json_str(r#"{"devices": {"porch": {"ip": " "}}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = MonitorConfig::from_json_str(r#"{"devices": {"porch": {}}}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));

        let result = MonitorConfig::from_json_str("not json");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = MonitorConfig::from_file("/nonexistent/airbeam.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::new()
            .with_device(DeviceConfig::new("porch", "10.0.0.5", "secret"))
            .with_debounce_window(Duration::from_millis(100))
            .with_overrun_policy(OverrunPolicy::Queue);

        assert!(config.device("porch").is_some());
        assert_eq!(config.debounce_window(), Duration::from_millis(100));
        assert_eq!(config.overrun_policy, OverrunPolicy::Queue);
        assert!(config.validate().is_ok());
    }
}
