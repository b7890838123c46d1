//! HTTP client for AirBeam camera devices
//!
//! This crate provides a minimal client for talking to AirBeam camera apps
//! over their local HTTP interface. It covers the two things a monitor needs:
//! reading the device's current status property list, and issuing the
//! fire-and-forget torch and recorder control calls.
//!
//! The [`DeviceApi`] trait is the seam the monitor polls through, so the
//! polling engine can be exercised without a device on the network.

mod client;
mod device;
mod error;
mod status;

pub use client::{Command, DeviceApi, DeviceClient, RecorderAction, TorchMode};
pub use device::DeviceConfig;
pub use error::{ClientError, Result};
pub use status::RawStatus;
