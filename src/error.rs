//! Error type shared by every part of the ranger.
//!
//! Only `HardwareUnavailable`, `Config` and `Logging` are fatal, and only at
//! startup. Timeouts and bad commands are recovered where they happen and
//! end up as a `Measurement` status or an ignored write.

use crate::gpio::PinRole;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorError>;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("echo line did not respond within {0:?}")]
    CaptureTimeout(Duration),

    #[error("a capture is already in flight")]
    Busy,

    #[error("invalid command {0:?}")]
    InvalidCommand(String),

    #[error("write of {len} bytes exceeds the {capacity}-byte command buffer")]
    OversizedInput { len: usize, capacity: usize },

    #[error("{role} line unavailable: {reason}")]
    HardwareUnavailable { role: PinRole, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("could not install log subscriber: {0}")]
    Logging(String),
}

impl From<figment::Error> for SensorError {
    fn from(err: figment::Error) -> Self {
        SensorError::Config(Box::new(err))
    }
}
