//! Start/stop debouncing for boolean-like detector fields
//!
//! A transition is honored only once the field has been quiet for the
//! debounce window: the window is measured from the most recent *active*
//! reading, and every active reading pushes it forward. A stop therefore
//! needs the field to stay inactive for a whole window after the last `yes`,
//! not a window after the original start.

use std::time::{Duration, Instant};

/// Quiet interval required before a transition is honored
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(5000);

/// Typed view of a tracked detector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reading {
    /// Raw value `yes`
    Active,
    /// Raw value `no`
    #[default]
    Inactive,
}

impl Reading {
    pub const ACTIVE: &'static str = "yes";
    pub const INACTIVE: &'static str = "no";

    /// Decode a raw field value.
    ///
    /// Anything outside the `yes`/`no` vocabulary (including a field the
    /// device did not report) is unrecognised and yields `None`.
    pub fn from_raw(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some(Self::ACTIVE) => Some(Reading::Active),
            Some(Self::INACTIVE) => Some(Reading::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reading::Active => Self::ACTIVE,
            Reading::Inactive => Self::INACTIVE,
        }
    }
}

/// A debounced transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    Stop,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Stop => "stop",
        }
    }
}

/// Debounced state of one tracked property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyState {
    /// Last honored value
    pub value: Reading,
    /// Time of the most recent active reading; cleared when a stop fires
    pub active_since: Option<Instant>,
}

impl PropertyState {
    pub fn is_active(&self) -> bool {
        self.value == Reading::Active
    }
}

/// The debounce engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Fold one raw reading into a property's state.
    ///
    /// Returns the updated state and the transition to emit, if any. A
    /// rejected change leaves `value` untouched; the flicker is absorbed.
    pub fn evaluate(
        &self,
        previous: &PropertyState,
        raw: Option<&str>,
        now: Instant,
    ) -> (PropertyState, Option<Transition>) {
        let reading = Reading::from_raw(raw);
        let changed = reading != Some(previous.value);
        let timeout_reached = match previous.active_since {
            None => true,
            Some(since) => now.saturating_duration_since(since) >= self.window,
        };

        let mut next = *previous;
        let mut transition = None;

        if changed && timeout_reached {
            match reading {
                Some(Reading::Active) => {
                    next.value = Reading::Active;
                    transition = Some(Transition::Start);
                }
                Some(Reading::Inactive) => {
                    next.value = Reading::Inactive;
                    next.active_since = None;
                    transition = Some(Transition::Stop);
                }
                None => {}
            }
        }

        if reading == Some(Reading::Active) {
            next.active_since = Some(now);
        }

        (next, transition)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
