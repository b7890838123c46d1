//! Per-device debounced record.

use std::collections::HashMap;

use crate::debounce::PropertyState;

/// Everything the monitor remembers about one device between polls.
///
/// A fresh `DeviceState` reports every property as inactive and never
/// active, and the recorder as stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    properties: HashMap<String, PropertyState>,
    /// Whether the recorder was running at the last successful poll
    pub recording: bool,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Debounced state of `name`, defaulting to inactive if never seen.
    pub fn property(&self, name: &str) -> PropertyState {
        self.properties.get(name).copied().unwrap_or_default()
    }

    pub fn set_property(&mut self, name: impl Into<String>, state: PropertyState) {
        self.properties.insert(name.into(), state);
    }

    /// Whether `name` is currently debounced-active
    pub fn is_active(&self, name: &str) -> bool {
        self.property(name).is_active()
    }

    /// Iterate over tracked properties in arbitrary order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyState)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}
