//! Digital line capabilities the engine drives.
//!
//! The engine never touches a GPIO controller directly. It sees a trigger
//! [`OutputLine`] and an echo [`InputLine`]; `utils::hc_sr04` provides them
//! for a Raspberry Pi and `utils::simulated` for everything else.

use crate::error::{Result, SensorError};
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    Trigger,
    Echo,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinRole::Trigger => f.write_str("trigger"),
            PinRole::Echo => f.write_str("echo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// A level transition seen on a line, stamped when the notification ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub pin: PinRole,
    pub level: Level,
    pub timestamp: Instant,
}

/// Called for every rising and falling edge, on whatever thread the line
/// delivers notifications from.
pub type EdgeHandler = Box<dyn FnMut(Level) + Send + 'static>;

pub trait OutputLine: Send {
    fn set(&mut self, level: Level);
}

pub trait InputLine: Send {
    fn level(&self) -> Level;

    /// Registers `handler` for both edges. Replaces any earlier handler.
    fn subscribe_edges(&mut self, _handler: EdgeHandler) -> Result<()> {
        Err(SensorError::HardwareUnavailable {
            role: PinRole::Echo,
            reason: "edge notifications not supported by this line".to_string(),
        })
    }
}
