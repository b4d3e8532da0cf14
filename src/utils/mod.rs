/// Utilities Module
///
/// Sources of trigger and echo lines: real Raspberry Pi GPIO through rppal,
/// and an in-process simulated sensor.
pub mod hc_sr04;
pub mod simulated;
