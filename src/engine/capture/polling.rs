use super::{CaptureWindow, EchoCapture};
use crate::engine::measurement::Measurement;
use crate::engine::pulse::PulseGenerator;
use crate::engine::store::{Published, ResultStore};
use crate::error::{Result, SensorError};
use crate::gpio::{InputLine, Level};
use std::hint;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Busy-waits on the echo line. Occupies the calling thread for the whole
/// cycle, up to twice the timeout.
pub struct PollingCapture {
    echo: Mutex<Box<dyn InputLine>>,
}

impl PollingCapture {
    pub fn new(echo: Box<dyn InputLine>) -> Self {
        Self {
            echo: Mutex::new(echo),
        }
    }
}

impl EchoCapture for PollingCapture {
    fn capture(
        &self,
        pulse: &mut PulseGenerator,
        timeout: Duration,
        store: &ResultStore,
    ) -> Result<Published> {
        let echo = self.echo.lock().unwrap_or_else(PoisonError::into_inner);
        let mut window = CaptureWindow::new();

        // An echo still high from an earlier pulse is not this cycle's start.
        wait_for_level(&**echo, Level::Low, timeout)
            .ok_or(SensorError::CaptureTimeout(timeout))?;
        pulse.fire();
        let start = wait_for_level(&**echo, Level::High, timeout)
            .ok_or(SensorError::CaptureTimeout(timeout))?;
        window.mark_start(start);
        let end = wait_for_level(&**echo, Level::Low, timeout)
            .ok_or(SensorError::CaptureTimeout(timeout))?;
        let elapsed = window
            .mark_end(end)
            .ok_or(SensorError::CaptureTimeout(timeout))?;

        let measurement = Measurement::from_elapsed(elapsed);
        let seq = store.publish(measurement);
        Ok(Published { seq, measurement })
    }
}

fn wait_for_level(echo: &dyn InputLine, level: Level, timeout: Duration) -> Option<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if echo.level() == level {
            return Some(Instant::now());
        }
        if Instant::now() >= deadline {
            return None;
        }
        hint::spin_loop();
    }
}
