use hcsr04_ranger::config::{CaptureSettings, SchedulerSettings};
use hcsr04_ranger::engine::scheduler::SchedulerState;
use hcsr04_ranger::utils::simulated::SimulatedSensor;
use hcsr04_ranger::{CaptureStrategy, MeasurementStatus, SensorEngine, SensorError, Settings};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const STRATEGIES: [CaptureStrategy; 2] = [CaptureStrategy::Polling, CaptureStrategy::EventDriven];

fn settings(strategy: CaptureStrategy) -> Settings {
    Settings {
        capture: CaptureSettings {
            strategy,
            ..CaptureSettings::default()
        },
        ..Settings::default()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn measures_a_target_with_either_strategy() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::at_distance(30.0);
        let engine = SensorEngine::simulated(&sensor, &settings(strategy)).unwrap();

        let m = engine.measure().unwrap();
        assert_eq!(m.status, MeasurementStatus::Ok, "{strategy:?}");
        assert!(m.distance_cm >= 29.0 && m.distance_cm < 150.0, "{strategy:?}: {m:?}");
        assert!(m.taken_at.is_some());
        assert_eq!(engine.current(), m);
        assert_eq!(sensor.pulses(), 1);
    }
}

#[test]
fn nothing_measured_before_first_cycle() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::at_distance(30.0);
        let engine = SensorEngine::simulated(&sensor, &settings(strategy)).unwrap();
        assert_eq!(engine.current().status, MeasurementStatus::NotYetMeasured);
        assert_eq!(sensor.pulses(), 0);
    }
}

#[test]
fn timeout_keeps_the_previous_reading() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::at_distance(20.0);
        let engine = SensorEngine::simulated(&sensor, &settings(strategy)).unwrap();
        let good = engine.measure().unwrap();
        assert!(good.is_ok());

        sensor.set_distance(None);
        let started = Instant::now();
        let m = engine.measure().unwrap();
        assert_eq!(m.status, MeasurementStatus::Timeout, "{strategy:?}");
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(engine.current(), good);
        assert_eq!(engine.snapshot().seq, 1);
    }
}

#[test]
fn overlapping_cycles_are_rejected() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::out_of_range();
        sensor.set_echo_width(Some(Duration::from_millis(20)));
        let engine = Arc::new(SensorEngine::simulated(&sensor, &settings(strategy)).unwrap());

        let first = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.measure())
        };
        assert!(wait_until(|| engine.store().in_flight()));

        for _ in 0..3 {
            assert!(matches!(engine.measure(), Err(SensorError::Busy)));
        }

        let m = first.join().unwrap().unwrap();
        assert_eq!(m.status, MeasurementStatus::Ok, "{strategy:?}");
        assert!(m.elapsed >= Duration::from_millis(20));
        assert_eq!(sensor.pulses(), 1);
        assert!(!engine.store().in_flight());
    }
}

#[test]
fn periodic_mode_keeps_publishing() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::at_distance(15.0);
        let engine = SensorEngine::simulated(&sensor, &settings(strategy)).unwrap();

        assert!(engine.start_periodic_every(Duration::from_millis(10)));
        assert!(wait_until(|| engine.snapshot().seq >= 3), "{strategy:?}");
        assert!(engine.stop_periodic());
        assert_eq!(engine.scheduler_state(), SchedulerState::Idle);

        let pulses = sensor.pulses();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sensor.pulses(), pulses);
    }
}

#[test]
fn start_periodic_setting_enters_periodic_mode() {
    let sensor = SimulatedSensor::at_distance(15.0);
    let settings = Settings {
        scheduler: SchedulerSettings {
            period: Duration::from_millis(20),
            start_periodic: true,
        },
        ..settings(CaptureStrategy::EventDriven)
    };
    let engine = SensorEngine::simulated(&sensor, &settings).unwrap();
    assert_eq!(
        engine.scheduler_state(),
        SchedulerState::Periodic {
            period: Duration::from_millis(20)
        }
    );
    assert!(wait_until(|| engine.current().is_ok()));
}

#[test]
fn measured_sequence_number_is_the_one_published() {
    for strategy in STRATEGIES {
        let sensor = SimulatedSensor::at_distance(25.0);
        let engine = SensorEngine::simulated(&sensor, &settings(strategy)).unwrap();
        engine
            .store()
            .publish(hcsr04_ranger::Measurement::from_elapsed(Duration::from_micros(580)));

        let published = engine.measure_published().unwrap();
        assert_eq!(published.seq, 2, "{strategy:?}");
        assert_eq!(engine.snapshot(), published);

        sensor.set_distance(None);
        let timed_out = engine.measure_published().unwrap();
        assert_eq!(timed_out.measurement.status, MeasurementStatus::Timeout);
        assert_eq!(timed_out.seq, 2);
        assert_eq!(engine.snapshot(), published);
    }
}
