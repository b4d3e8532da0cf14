use super::distance::to_distance;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementStatus {
    Ok,
    Timeout,
    NotYetMeasured,
}

/// The outcome of one capture cycle. Never mutated; the next cycle
/// supersedes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub distance_cm: f64,
    pub status: MeasurementStatus,
    /// Wall-clock time the cycle completed, absent when nothing was measured.
    pub taken_at: Option<DateTime<Utc>>,
}

impl Measurement {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self {
            elapsed,
            distance_cm: to_distance(elapsed),
            status: MeasurementStatus::Ok,
            taken_at: Some(Utc::now()),
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: MeasurementStatus::Timeout,
            taken_at: Some(Utc::now()),
            ..Self::not_yet_measured()
        }
    }

    pub fn not_yet_measured() -> Self {
        Self {
            elapsed: Duration::ZERO,
            distance_cm: 0.0,
            status: MeasurementStatus::NotYetMeasured,
            taken_at: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == MeasurementStatus::Ok
    }
}

impl Default for Measurement {
    fn default() -> Self {
        Self::not_yet_measured()
    }
}
