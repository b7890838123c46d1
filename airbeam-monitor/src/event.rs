//! Device events and the subscription registry
//!
//! Events are named `<device>:<signal>:<kind>`, e.g.
//! `porch:motionDetected:start` or `porch:audioLevel:update`. Subscribers
//! attach a callback to an exact name, or to every event with
//! [`EventBus::subscribe_all`]. Delivery is synchronous on the publishing
//! task, in subscription order, and nothing is retained for late
//! subscribers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use airbeam_state::Transition;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::trace;

/// Kind of a device event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Debounced detector transition to active
    Start,
    /// Debounced detector transition to inactive
    Stop,
    /// Level reading, formatted as a two-decimal percentage
    Update(String),
}

impl EventKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Update(_) => "update",
        }
    }
}

impl From<Transition> for EventKind {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Start => EventKind::Start,
            Transition::Stop => EventKind::Stop,
        }
    }
}

/// A notification about one device signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    /// Configured device name
    pub device: String,
    /// Property or level name (e.g. `motionDetected`, `audioLevel`)
    pub signal: String,
    pub kind: EventKind,
}

impl DeviceEvent {
    pub fn new(device: impl Into<String>, signal: impl Into<String>, kind: EventKind) -> Self {
        Self {
            device: device.into(),
            signal: signal.into(),
            kind,
        }
    }

    /// Subscription name of this event
    pub fn name(&self) -> String {
        event_name(&self.device, &self.signal, self.kind.suffix())
    }

    /// Payload of an update event
    pub fn payload(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Update(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload() {
            Some(payload) => write!(f, "{} {}", self.name(), payload),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Build an event name, e.g. `event_name("porch", "motionDetected", "start")`.
pub fn event_name(device: &str, signal: &str, suffix: &str) -> String {
    format!("{}:{}:{}", device, signal, suffix)
}

/// Handle returned by subscribe calls, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Listener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    by_name: DashMap<String, Vec<(SubscriptionId, Listener)>>,
    catch_all: RwLock<Vec<(SubscriptionId, Listener)>>,
}

/// Callback registry events are published through. Clones share listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Call `listener` for every event named `name`.
    pub fn subscribe<F>(&self, name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.registry
            .by_name
            .entry(name.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Call `listener` for every event.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.registry.catch_all.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        {
            let mut catch_all = self.registry.catch_all.write();
            let before = catch_all.len();
            catch_all.retain(|(existing, _)| *existing != id);
            if catch_all.len() != before {
                return true;
            }
        }

        let mut removed = false;
        self.registry.by_name.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|(existing, _)| *existing != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        removed
    }

    /// Number of listeners that would receive an event named `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        let named = self
            .registry
            .by_name
            .get(name)
            .map(|listeners| listeners.len())
            .unwrap_or(0);
        named + self.registry.catch_all.read().len()
    }

    /// Deliver an event to its subscribers.
    ///
    /// Listeners are collected before any is called, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub fn publish(&self, event: &DeviceEvent) {
        let name = event.name();
        let mut listeners: Vec<Listener> = self
            .registry
            .by_name
            .get(&name)
            .map(|entry| entry.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        listeners.extend(
            self.registry
                .catch_all
                .read()
                .iter()
                .map(|(_, l)| Arc::clone(l)),
        );

        trace!(event = %name, listeners = listeners.len(), "publishing event");
        for listener in listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("named_subscriptions", &self.registry.by_name.len())
            .field("catch_all_subscriptions", &self.registry.catch_all.read().len())
            .finish()
    }
}
