//! Shared per-device state table
//!
//! `StateStore` is an explicitly owned table from device name to
//! [`DeviceState`]. Clones share the same table, so the scheduler, the
//! host-facing monitor and tests can all hold a handle without any global.
//!
//! Each device's entry is written only by that device's poll cycle; readers
//! must cope with a device that has never been polled successfully.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::device_state::DeviceState;

/// Device name → debounced state table
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    devices: Arc<RwLock<HashMap<String, DeviceState>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a device's state, if it has been polled successfully.
    pub fn get(&self, device: &str) -> Option<DeviceState> {
        self.devices.read().get(device).cloned()
    }

    /// Replace a device's state, returning the previous entry.
    pub fn replace(&self, device: &str, state: DeviceState) -> Option<DeviceState> {
        trace!(device, recording = state.recording, "storing device state");
        self.devices.write().insert(device.to_string(), state)
    }

    /// Last known recorder status; `false` for unknown or never-polled devices.
    pub fn is_recording(&self, device: &str) -> bool {
        self.devices
            .read()
            .get(device)
            .map(|state| state.recording)
            .unwrap_or(false)
    }

    pub fn contains(&self, device: &str) -> bool {
        self.devices.read().contains_key(device)
    }

    /// Number of devices with a stored state
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Names of devices with a stored state, sorted.
    pub fn device_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_device_reads() {
        let store = StateStore::new();

        assert_eq!(store.get("ghost-device"), None);
        assert!(!store.is_recording("ghost-device"));
        assert!(!store.contains("ghost-device"));
        assert_eq!(store.device_count(), 0);
    }

    #[test]
    fn test_replace_returns_previous() {
        let store = StateStore::new();
        let mut recording = DeviceState::default();
        recording.recording = true;

        assert_eq!(store.replace("porch", recording.clone()), None);
        assert!(store.is_recording("porch"));

        let previous = store.replace("porch", DeviceState::default());
        assert_eq!(previous, Some(recording));
        assert!(!store.is_recording("porch"));
    }

    #[test]
    fn test_clone_shares_table() {
        let store = StateStore::new();
        let handle = store.clone();

        store.replace("garage", DeviceState::default());
        store.replace("porch", DeviceState::default());

        assert_eq!(handle.device_count(), 2);
        assert_eq!(handle.device_names(), vec!["garage".to_string(), "porch".to_string()]);
    }
}
