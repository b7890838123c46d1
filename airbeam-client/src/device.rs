//! Device identity and credentials.

use serde::Deserialize;

fn default_username() -> String {
    "user".to_string()
}

/// Identity of a monitored AirBeam device.
///
/// Devices are configured by name; the name is what events are keyed by,
/// while `address` and the credential pair are only used to reach the device.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Display name, unique within a configuration
    #[serde(default)]
    pub name: String,
    /// Host or `host:port` of the device's HTTP interface
    #[serde(alias = "ip")]
    pub address: String,
    /// Basic-auth username. AirBeam always uses `user`.
    #[serde(default = "default_username")]
    pub username: String,
    /// Basic-auth password shared with the device
    #[serde(default)]
    pub password: String,
}

impl DeviceConfig {
    /// Create a device config with the default username.
    pub fn new(name: impl Into<String>, address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            username: default_username(),
            password: password.into(),
        }
    }

    /// Base URL of the device's HTTP interface.
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.address.trim_end_matches('/'))
        }
    }
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let device = DeviceConfig::new("porch", "192.168.1.20", "secret");
        assert_eq!(device.base_url(), "http://192.168.1.20");

        let device = DeviceConfig::new("porch", "192.168.1.20:8080/", "secret");
        assert_eq!(device.base_url(), "http://192.168.1.20:8080");

        let device = DeviceConfig::new("porch", "https://cam.local", "secret");
        assert_eq!(device.base_url(), "https://cam.local");
    }

    #[test]
    fn test_deserialize_with_ip_alias() {
        let device: DeviceConfig =
            serde_json::from_str(r#"{"ip": "10.0.0.5", "password": "hunter2"}"#).unwrap();

        assert_eq!(device.address, "10.0.0.5");
        assert_eq!(device.username, "user");
        assert_eq!(device.password, "hunter2");
        assert!(device.name.is_empty());
    }

    #[test]
    fn test_debug_redacts_password() {
        let device = DeviceConfig::new("porch", "10.0.0.5", "hunter2");
        let debug = format!("{:?}", device);
        assert!(debug.contains("porch"));
        assert!(!debug.contains("hunter2"));
    }
}
