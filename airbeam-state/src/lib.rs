//! Debounced device state for the AirBeam monitor
//!
//! Raw detector fields on an AirBeam device flip between `yes` and `no` many
//! times a second while something is moving at the edge of the frame. This
//! crate turns those readings into clean start/stop transitions and keeps the
//! per-device record the transitions are computed against.
//!
//! # Architecture
//!
//! ```text
//! StateStore
//!     │
//!     └── devices: HashMap<device name, DeviceState>
//!             │
//!             ├── properties: HashMap<property name, PropertyState>
//!             │       └── PropertyState { value: Reading, active_since }
//!             │
//!             └── recording: bool
//!
//! Debouncer::evaluate(previous, raw, now) -> (PropertyState, Option<Transition>)
//! ```
//!
//! The debouncer is a pure function of its inputs, so timing behavior can be
//! tested with synthetic `Instant`s.

pub mod debounce;
pub mod device_state;
pub mod store;

pub use debounce::{Debouncer, PropertyState, Reading, Transition, DEFAULT_WINDOW};
pub use device_state::DeviceState;
pub use store::StateStore;
