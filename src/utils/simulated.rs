/// Simulated Sensor Module
///
/// An in-process stand-in for an HC-SR04. Every trigger pulse makes the echo
/// line go high shortly afterwards for as long as sound would need to reach
/// the configured target and come back. Edges are delivered from a separate
/// thread, the same way GPIO interrupt callbacks arrive on real hardware.
use crate::config::MICROS_PER_CM;
use crate::error::Result;
use crate::gpio::{EdgeHandler, InputLine, Level, OutputLine};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

// Gap between the trigger falling edge and the echo rising edge
const ECHO_DELAY: Duration = Duration::from_micros(100);

#[derive(Clone)]
pub struct SimulatedSensor {
    shared: Arc<Shared>,
}

struct Shared {
    echo_high: AtomicBool,
    echo_width: Mutex<Option<Duration>>,
    handler: Mutex<Option<EdgeHandler>>,
    pulses: AtomicUsize,
}

impl SimulatedSensor {
    /// A sensor pointed at nothing: pulses never produce an echo.
    pub fn out_of_range() -> Self {
        Self {
            shared: Arc::new(Shared {
                echo_high: AtomicBool::new(false),
                echo_width: Mutex::new(None),
                handler: Mutex::new(None),
                pulses: AtomicUsize::new(0),
            }),
        }
    }

    pub fn at_distance(cm: f64) -> Self {
        let sensor = Self::out_of_range();
        sensor.set_distance(Some(cm));
        sensor
    }

    pub fn set_distance(&self, cm: Option<f64>) {
        self.set_echo_width(cm.map(|cm| Duration::from_secs_f64(cm * MICROS_PER_CM / 1e6)));
    }

    pub fn set_echo_width(&self, width: Option<Duration>) {
        *self
            .shared
            .echo_width
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = width;
    }

    /// Number of complete trigger pulses seen so far.
    pub fn pulses(&self) -> usize {
        self.shared.pulses.load(Ordering::SeqCst)
    }

    pub fn trigger_line(&self) -> SimulatedTrigger {
        SimulatedTrigger {
            shared: Arc::clone(&self.shared),
            level: Level::Low,
        }
    }

    pub fn echo_line(&self) -> SimulatedEcho {
        SimulatedEcho {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drives the echo line to `level` right now, from the calling thread.
    pub fn inject_edge(&self, level: Level) {
        self.shared.drive_echo(level);
    }
}

impl Shared {
    fn drive_echo(&self, level: Level) {
        self.echo_high.store(level == Level::High, Ordering::SeqCst);
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handler) = handler.as_mut() {
            handler(level);
        }
    }
}

pub struct SimulatedTrigger {
    shared: Arc<Shared>,
    level: Level,
}

impl OutputLine for SimulatedTrigger {
    fn set(&mut self, level: Level) {
        let falling = self.level == Level::High && level == Level::Low;
        self.level = level;
        if !falling {
            return;
        }

        self.shared.pulses.fetch_add(1, Ordering::SeqCst);
        let width = *self
            .shared
            .echo_width
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(width) = width {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                thread::sleep(ECHO_DELAY);
                shared.drive_echo(Level::High);
                thread::sleep(width);
                shared.drive_echo(Level::Low);
            });
        }
    }
}

pub struct SimulatedEcho {
    shared: Arc<Shared>,
}

impl InputLine for SimulatedEcho {
    fn level(&self) -> Level {
        if self.shared.echo_high.load(Ordering::SeqCst) {
            Level::High
        } else {
            Level::Low
        }
    }

    fn subscribe_edges(&mut self, handler: EdgeHandler) -> Result<()> {
        *self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
        Ok(())
    }
}
