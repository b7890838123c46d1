//! Error types for the AirBeam client

use thiserror::Error;

/// Errors that can occur while talking to a device
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, timeout or non-2xx response
    #[error("Fetch failed for {address}: {reason}")]
    Fetch {
        /// Address of the device the request was sent to
        address: String,
        /// Underlying cause
        reason: String,
    },

    /// The status body could not be decoded
    #[error("Status parsing error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Build a fetch error for a device address
    pub fn fetch(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
