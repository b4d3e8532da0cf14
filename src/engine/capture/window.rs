use std::time::{Duration, Instant};

/// Echo timestamps of the cycle currently in flight.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindow {
    echo_start: Option<Instant>,
    echo_end: Option<Instant>,
}

impl CaptureWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.echo_start.is_some()
    }

    /// Records the rising edge. Ignored (returns false) once a start is set.
    pub fn mark_start(&mut self, at: Instant) -> bool {
        if self.echo_start.is_some() {
            return false;
        }
        self.echo_start = Some(at);
        true
    }

    /// Records the falling edge and yields the echo width. Ignored when no
    /// start was recorded, an end already was, or `at` is not after the start.
    pub fn mark_end(&mut self, at: Instant) -> Option<Duration> {
        let start = self.echo_start?;
        if self.echo_end.is_some() || at <= start {
            return None;
        }
        self.echo_end = Some(at);
        Some(at - start)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match (self.echo_start, self.echo_end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
