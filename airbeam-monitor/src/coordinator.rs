//! One device's fetch → debounce → publish cycle.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use airbeam_client::{DeviceApi, DeviceConfig, RawStatus};
use airbeam_state::{Debouncer, DeviceState, StateStore};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::StatusLayout;
use crate::error::Result;
use crate::event::{DeviceEvent, EventBus, EventKind};

/// Format a raw fractional level as a two-decimal percentage.
///
/// `"0.4567"` becomes `"45.67"`. The value is read from the longest leading
/// decimal number, so `"0.5abc"` reads as `0.5`; text with no leading number
/// (including `"inf"` and `"nan"`) yields `"NaN"`, as does a missing level.
/// Negative zero prints as `"0.00"` and an overflowing product as
/// `"Infinity"`. Rounding is that of Rust's float formatting applied to the
/// exact binary value, so only exact ties differ from round-half-up.
pub fn format_level(raw: Option<&str>) -> String {
    let Some(fraction) = raw.and_then(leading_number) else {
        return "NaN".to_string();
    };

    let percent = fraction * 100.0;
    if percent.is_infinite() {
        return if percent > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // -0.0 == 0.0
    let percent = if percent == 0.0 { 0.0 } else { percent };
    format!("{:.2}", percent)
}

/// Parse the decimal number at the start of `raw`, ignoring anything after it.
fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

/// Runs poll cycles for individual devices.
///
/// Polls of the same device are serialised through a per-device in-flight
/// lock, whichever scheduler or caller starts them.
pub struct PollCoordinator {
    api: Arc<dyn DeviceApi>,
    store: StateStore,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    debouncer: Debouncer,
    layout: StatusLayout,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl PollCoordinator {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        store: StateStore,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        debouncer: Debouncer,
        layout: StatusLayout,
    ) -> Self {
        Self {
            api,
            store,
            bus,
            clock,
            debouncer,
            layout,
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn layout(&self) -> &StatusLayout {
        &self.layout
    }

    /// Compute a device's next state and the events it produces.
    ///
    /// Detector transitions come first, in `layout.tracked` order, followed
    /// by one update per level field in `layout.levels` order.
    pub fn apply(
        &self,
        device: &str,
        prior: &DeviceState,
        status: &RawStatus,
        now: Instant,
    ) -> (DeviceState, Vec<DeviceEvent>) {
        let mut next = prior.clone();
        let mut events = Vec::with_capacity(self.layout.tracked.len() + self.layout.levels.len());

        for property in &self.layout.tracked {
            let previous = prior.property(property);
            let (updated, transition) = self.debouncer.evaluate(&previous, status.get(property), now);
            next.set_property(property.clone(), updated);

            if let Some(transition) = transition {
                events.push(DeviceEvent::new(device, property.clone(), transition.into()));
            }
        }

        for level in &self.layout.levels {
            events.push(DeviceEvent::new(
                device,
                level.clone(),
                EventKind::Update(format_level(status.get(level))),
            ));
        }

        next.recording = status.get(&self.layout.mode_field) != Some(self.layout.idle_value.as_str());

        (next, events)
    }

    fn in_flight(&self, device: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.in_flight.entry(device.to_string()).or_default().value())
    }

    /// Poll one device, store its new state and publish its events.
    ///
    /// Waits for any poll of the same device that is already running. On a
    /// fetch or parse failure the stored state is left untouched and nothing
    /// is published.
    pub async fn poll_one(&self, device: &DeviceConfig) -> Result<Vec<DeviceEvent>> {
        let _guard = self.in_flight(&device.name).lock_owned().await;
        self.poll_locked(device).await
    }

    /// Like [`poll_one`](Self::poll_one), but returns `None` without polling
    /// if the device already has a poll in flight.
    pub async fn try_poll_one(&self, device: &DeviceConfig) -> Option<Result<Vec<DeviceEvent>>> {
        let Ok(_guard) = self.in_flight(&device.name).try_lock_owned() else {
            debug!(device = %device.name, "previous poll still in flight, skipping");
            return None;
        };
        Some(self.poll_locked(device).await)
    }

    async fn poll_locked(&self, device: &DeviceConfig) -> Result<Vec<DeviceEvent>> {
        let status = match self.api.fetch_status(device).await {
            Ok(status) => status,
            Err(e) => {
                warn!(device = %device.name, error = %e, "status poll failed");
                return Err(e.into());
            }
        };

        let now = self.clock.now();
        let prior = self.store.get(&device.name).unwrap_or_default();
        let (next, events) = self.apply(&device.name, &prior, &status, now);

        if next.recording != prior.recording {
            debug!(device = %device.name, recording = next.recording, "recorder status changed");
        }
        self.store.replace(&device.name, next);

        for event in &events {
            if !matches!(event.kind, EventKind::Update(_)) {
                debug!(event = %event.name(), "detector transition");
            }
            self.bus.publish(event);
        }

        Ok(events)
    }
}

impl fmt::Debug for PollCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollCoordinator")
            .field("debouncer", &self.debouncer)
            .field("layout", &self.layout)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
