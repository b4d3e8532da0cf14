//! The distance measurement engine.
//!
//! [`SensorEngine`] owns everything one sensor needs: the trigger pulse
//! generator, the echo capture strategy, the result store and the periodic
//! scheduler. One cycle runs pulse → capture → distance → publish, and the
//! store's single-flight guard makes sure cycles never overlap, whether they
//! are started by a read or by a scheduler tick.

pub mod capture;
pub mod distance;
pub mod measurement;
pub mod pulse;
pub mod scheduler;
pub mod store;

use crate::config::{CaptureSettings, CaptureStrategy, SchedulerSettings, Settings};
use crate::error::{Result, SensorError};
use crate::gpio::{InputLine, OutputLine};
use crate::utils::hc_sr04::HcSr04Lines;
use crate::utils::simulated::SimulatedSensor;
use capture::EchoCapture;
use measurement::Measurement;
use pulse::PulseGenerator;
use scheduler::{MeasurementScheduler, SchedulerState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use store::{Published, ResultStore};
use tracing::{debug, warn};

pub struct SensorEngine {
    core: Arc<EngineCore>,
    scheduler: MeasurementScheduler,
    strategy: CaptureStrategy,
    period: Duration,
}

struct EngineCore {
    pulse: Mutex<PulseGenerator>,
    capture: Box<dyn EchoCapture>,
    store: ResultStore,
    timeout: Duration,
}

impl EngineCore {
    /// The returned sequence number is read while the cycle still holds the
    /// single-flight guard, so no other publish can slip in between.
    fn run_cycle(&self) -> Result<Published> {
        let _in_flight = self.store.begin_capture().ok_or(SensorError::Busy)?;
        let mut pulse = self.pulse.lock().unwrap_or_else(PoisonError::into_inner);

        match self.capture.capture(&mut pulse, self.timeout, &self.store) {
            Ok(published) => {
                debug!(
                    seq = published.seq,
                    elapsed_us = published.measurement.elapsed.as_micros() as u64,
                    distance_cm = published.measurement.distance_cm,
                    "measurement published"
                );
                Ok(published)
            }
            Err(SensorError::CaptureTimeout(budget)) => {
                warn!(?budget, "no echo within budget");
                Ok(Published {
                    seq: self.store.snapshot().seq,
                    measurement: Measurement::timeout(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

impl SensorEngine {
    /// Builds an engine over already acquired lines. Fails without side
    /// effects when the echo line cannot deliver what the strategy needs.
    pub fn new(
        trigger: Box<dyn OutputLine>,
        echo: Box<dyn InputLine>,
        capture_settings: &CaptureSettings,
        scheduler_settings: &SchedulerSettings,
    ) -> Result<Self> {
        let core = EngineCore {
            pulse: Mutex::new(PulseGenerator::new(trigger, capture_settings.pulse_width)),
            capture: capture::for_strategy(capture_settings.strategy, echo)?,
            store: ResultStore::new(),
            timeout: capture_settings.timeout,
        };
        let engine = Self {
            core: Arc::new(core),
            scheduler: MeasurementScheduler::new(),
            strategy: capture_settings.strategy,
            period: scheduler_settings.period,
        };
        debug!(strategy = ?engine.strategy, period = ?engine.period, "sensor engine ready");

        if scheduler_settings.start_periodic {
            engine.start_periodic();
        }
        Ok(engine)
    }

    /// Acquires the configured Raspberry Pi GPIO lines.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let lines = HcSr04Lines::acquire(&settings.gpio)?;
        Self::new(
            Box::new(lines.trigger),
            Box::new(lines.echo),
            &settings.capture,
            &settings.scheduler,
        )
    }

    pub fn simulated(sensor: &SimulatedSensor, settings: &Settings) -> Result<Self> {
        Self::new(
            Box::new(sensor.trigger_line()),
            Box::new(sensor.echo_line()),
            &settings.capture,
            &settings.scheduler,
        )
    }

    /// Runs one full cycle on the calling thread. A timeout comes back as a
    /// `Timeout` measurement and leaves the store alone; `Busy` means another
    /// cycle is in flight and nothing was fired.
    pub fn measure(&self) -> Result<Measurement> {
        self.measure_published().map(|published| published.measurement)
    }

    /// Like [`measure`](Self::measure), paired with the store sequence
    /// number the result corresponds to. A timeout carries the sequence
    /// number of the reading it left in place.
    pub fn measure_published(&self) -> Result<Published> {
        self.core.run_cycle()
    }

    pub fn current(&self) -> Measurement {
        self.core.store.current()
    }

    pub fn snapshot(&self) -> Published {
        self.core.store.snapshot()
    }

    pub fn store(&self) -> &ResultStore {
        &self.core.store
    }

    pub fn strategy(&self) -> CaptureStrategy {
        self.strategy
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start_periodic(&self) -> bool {
        self.start_periodic_every(self.period)
    }

    pub fn start_periodic_every(&self, period: Duration) -> bool {
        let core = Arc::clone(&self.core);
        self.scheduler.start(period, move || match core.run_cycle() {
            Ok(_) => {}
            Err(SensorError::Busy) => debug!("tick skipped, capture in flight"),
            Err(err) => warn!(%err, "periodic measurement failed"),
        })
    }

    pub fn stop_periodic(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }
}
