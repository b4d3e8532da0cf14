use super::{CaptureWindow, EchoCapture};
use crate::engine::measurement::Measurement;
use crate::engine::pulse::PulseGenerator;
use crate::engine::store::{Published, ResultStore};
use crate::error::{Result, SensorError};
use crate::gpio::{EdgeEvent, InputLine, Level, PinRole};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

enum EdgeNotice {
    Started,
    Completed(Published),
}

/// The window edges may currently write to. `None` between cycles, so
/// late edges from an abandoned cycle have nowhere to land.
struct OpenWindow {
    window: CaptureWindow,
    notices: Sender<EdgeNotice>,
    store: ResultStore,
}

type WindowSlot = Mutex<Option<OpenWindow>>;

/// Times the echo from edge notifications.
///
/// The notification thread only stamps edges and, on a valid falling edge,
/// publishes the measurement. The thread that fired the pulse acts as the
/// watchdog: it waits for the notices with a bounded timeout and closes the
/// window when it gives up.
pub struct EdgeCapture {
    slot: Arc<WindowSlot>,
    // Keeps the edge subscription alive.
    _echo: Mutex<Box<dyn InputLine>>,
}

impl EdgeCapture {
    pub fn new(mut echo: Box<dyn InputLine>) -> Result<Self> {
        let slot: Arc<WindowSlot> = Arc::new(Mutex::new(None));
        let handler_slot = Arc::clone(&slot);
        echo.subscribe_edges(Box::new(move |level| {
            on_edge(
                &handler_slot,
                EdgeEvent {
                    pin: PinRole::Echo,
                    level,
                    timestamp: Instant::now(),
                },
            )
        }))?;

        Ok(Self {
            slot,
            _echo: Mutex::new(echo),
        })
    }
}

fn lock(slot: &WindowSlot) -> MutexGuard<'_, Option<OpenWindow>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn on_edge(slot: &WindowSlot, event: EdgeEvent) {
    let mut slot = lock(slot);
    let Some(open) = slot.as_mut() else {
        trace!(level = ?event.level, "edge outside a capture window discarded");
        return;
    };

    let completed = match event.level {
        Level::High => {
            if open.window.mark_start(event.timestamp) {
                let _ = open.notices.try_send(EdgeNotice::Started);
            } else {
                trace!("repeated rising edge ignored");
            }
            false
        }
        Level::Low => match open.window.mark_end(event.timestamp) {
            Some(elapsed) => {
                let measurement = Measurement::from_elapsed(elapsed);
                let seq = open.store.publish(measurement);
                let _ = open
                    .notices
                    .try_send(EdgeNotice::Completed(Published { seq, measurement }));
                true
            }
            None => {
                trace!(started = open.window.is_started(), "falling edge ignored");
                false
            }
        },
    };

    if completed {
        *slot = None;
    }
}

fn watch(notices: &Receiver<EdgeNotice>, timeout: Duration) -> Option<Published> {
    match notices.recv_timeout(timeout).ok()? {
        EdgeNotice::Completed(published) => Some(published),
        EdgeNotice::Started => match notices.recv_timeout(timeout).ok()? {
            EdgeNotice::Completed(published) => Some(published),
            EdgeNotice::Started => None,
        },
    }
}

impl EchoCapture for EdgeCapture {
    fn capture(
        &self,
        pulse: &mut PulseGenerator,
        timeout: Duration,
        store: &ResultStore,
    ) -> Result<Published> {
        let (notices, watched) = bounded(2);
        *lock(&self.slot) = Some(OpenWindow {
            window: CaptureWindow::new(),
            notices,
            store: store.clone(),
        });

        pulse.fire();
        let outcome = watch(&watched, timeout);
        let abandoned = lock(&self.slot).take();

        match outcome {
            Some(published) => Ok(published),
            // The falling edge won the race against the watchdog closing
            // the window; its measurement is already published.
            None if abandoned.is_none() => watched
                .try_iter()
                .find_map(|notice| match notice {
                    EdgeNotice::Completed(published) => Some(published),
                    EdgeNotice::Started => None,
                })
                .ok_or(SensorError::CaptureTimeout(timeout)),
            None => Err(SensorError::CaptureTimeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::measurement::MeasurementStatus;
    use crate::utils::simulated::SimulatedSensor;
    use std::thread;

    fn pulse_for(sensor: &SimulatedSensor) -> PulseGenerator {
        PulseGenerator::new(Box::new(sensor.trigger_line()), Duration::from_micros(10))
    }

    #[test]
    fn edges_publish_from_notification_thread() {
        let sensor = SimulatedSensor::at_distance(50.0);
        let capture = EdgeCapture::new(Box::new(sensor.echo_line())).unwrap();
        let store = ResultStore::new();

        let published = capture
            .capture(&mut pulse_for(&sensor), Duration::from_millis(40), &store)
            .unwrap();
        let m = published.measurement;
        assert_eq!(published.seq, 1);
        assert_eq!(m.status, MeasurementStatus::Ok);
        assert!(m.distance_cm >= 49.0 && m.distance_cm < 200.0, "{m:?}");
        assert_eq!(store.current(), m);
        assert_eq!(store.snapshot().seq, 1);
    }

    #[test]
    fn no_rising_edge_times_out() {
        let sensor = SimulatedSensor::out_of_range();
        let capture = EdgeCapture::new(Box::new(sensor.echo_line())).unwrap();
        let store = ResultStore::new();
        let prior = Measurement::from_elapsed(Duration::from_micros(580));
        store.publish(prior);

        let err = capture
            .capture(&mut pulse_for(&sensor), Duration::from_millis(40), &store)
            .unwrap_err();
        assert!(matches!(err, SensorError::CaptureTimeout(_)));
        assert_eq!(store.current(), prior);
    }

    #[test]
    fn no_falling_edge_times_out() {
        // Echo rises 100 µs after the pulse and stays up far beyond the budget.
        let sensor = SimulatedSensor::out_of_range();
        sensor.set_echo_width(Some(Duration::from_millis(200)));
        let capture = EdgeCapture::new(Box::new(sensor.echo_line())).unwrap();
        let store = ResultStore::new();

        let err = capture
            .capture(&mut pulse_for(&sensor), Duration::from_millis(40), &store)
            .unwrap_err();
        assert!(matches!(err, SensorError::CaptureTimeout(_)));
        assert_eq!(store.current().status, MeasurementStatus::NotYetMeasured);

        // The late falling edge of the abandoned window must not publish.
        thread::sleep(Duration::from_millis(250));
        assert_eq!(store.current().status, MeasurementStatus::NotYetMeasured);
        assert_eq!(store.snapshot().seq, 0);
    }

    #[test]
    fn stale_edges_between_cycles_are_discarded() {
        let sensor = SimulatedSensor::out_of_range();
        let _capture = EdgeCapture::new(Box::new(sensor.echo_line())).unwrap();
        let store = ResultStore::new();

        sensor.inject_edge(Level::High);
        sensor.inject_edge(Level::Low);
        assert_eq!(store.snapshot().seq, 0);
    }

    #[test]
    fn duplicate_edges_do_not_corrupt_the_window() {
        let slot: WindowSlot = Mutex::new(None);
        let (notices, watched) = bounded(2);
        let store = ResultStore::new();
        *lock(&slot) = Some(OpenWindow {
            window: CaptureWindow::new(),
            notices,
            store: store.clone(),
        });

        let t0 = Instant::now();
        let edge = |level, offset_us| EdgeEvent {
            pin: PinRole::Echo,
            level,
            timestamp: t0 + Duration::from_micros(offset_us),
        };
        on_edge(&slot, edge(Level::Low, 0));
        on_edge(&slot, edge(Level::High, 10));
        on_edge(&slot, edge(Level::High, 200));
        on_edge(&slot, edge(Level::Low, 590));
        on_edge(&slot, edge(Level::Low, 900));

        assert!(lock(&slot).is_none());
        assert!(matches!(watched.try_recv(), Ok(EdgeNotice::Started)));
        match watched.try_recv() {
            Ok(EdgeNotice::Completed(published)) => {
                assert_eq!(published.seq, 1);
                assert_eq!(published.measurement.elapsed, Duration::from_micros(580));
            }
            _ => panic!("expected a completed notice"),
        }
        assert_eq!(store.current().distance_cm, 10.0);
        assert_eq!(store.snapshot().seq, 1);
    }

    #[test]
    fn line_without_edge_support_is_unavailable() {
        struct LevelOnly;
        impl InputLine for LevelOnly {
            fn level(&self) -> Level {
                Level::Low
            }
        }

        let err = EdgeCapture::new(Box::new(LevelOnly)).err().unwrap();
        assert!(matches!(
            err,
            SensorError::HardwareUnavailable {
                role: PinRole::Echo,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "echo line unavailable: edge notifications not supported by this line"
        );
    }
}
