use crate::config::MICROS_PER_CM;
use std::time::Duration;

/// One-way distance in centimeters for a round-trip echo of `elapsed`.
pub fn to_distance(elapsed: Duration) -> f64 {
    elapsed.as_micros() as f64 / MICROS_PER_CM
}
