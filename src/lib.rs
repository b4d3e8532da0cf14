//! # hcsr04_ranger
//!
//! Distance measurement with an HC-SR04 ultrasonic rangefinder wired to two
//! GPIO lines.
//!
//! - **`engine`**: trigger pulse, echo capture (polling or edge driven),
//!   distance conversion, result store and periodic scheduler.
//! - **`device`**: the read/write byte interface over an engine.
//! - **`gpio`**: the line capabilities the engine drives.
//! - **`utils`**: Raspberry Pi lines through `rppal`, and a simulated sensor.
//! - **`config`**, **`error`**, **`logging`**: settings, `SensorError`, log
//!   subscriber setup.

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod gpio;
pub mod logging;
pub mod utils;

pub use config::{CaptureStrategy, Settings};
pub use device::{DeviceHandle, SensorDevice};
pub use engine::measurement::{Measurement, MeasurementStatus};
pub use engine::SensorEngine;
pub use error::{Result, SensorError};
