use crate::gpio::{Level, OutputLine};
use std::hint;
use std::time::{Duration, Instant};

/// Owns the trigger line. One `fire` starts one ranging cycle.
pub struct PulseGenerator {
    trigger: Box<dyn OutputLine>,
    width: Duration,
}

impl PulseGenerator {
    pub fn new(mut trigger: Box<dyn OutputLine>, width: Duration) -> Self {
        trigger.set(Level::Low);
        Self { trigger, width }
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Holds the trigger high for the pulse width. Spins instead of sleeping,
    /// a sleep would overshoot 10 µs by orders of magnitude.
    pub fn fire(&mut self) {
        self.trigger.set(Level::High);
        spin_for(self.width);
        self.trigger.set(Level::Low);
    }
}

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingLine {
        writes: Arc<Mutex<Vec<(Level, Instant)>>>,
    }

    impl OutputLine for RecordingLine {
        fn set(&mut self, level: Level) {
            self.writes.lock().unwrap().push((level, Instant::now()));
        }
    }

    #[test]
    fn new_drives_trigger_low() {
        let line = RecordingLine::default();
        let _pulse = PulseGenerator::new(Box::new(line.clone()), Duration::from_micros(10));
        let writes = line.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, Level::Low);
    }

    #[test]
    fn fire_holds_high_for_at_least_the_width() {
        let line = RecordingLine::default();
        let mut pulse = PulseGenerator::new(Box::new(line.clone()), Duration::from_micros(10));
        pulse.fire();

        let writes = line.writes.lock().unwrap();
        let levels: Vec<_> = writes.iter().map(|(level, _)| *level).collect();
        assert_eq!(levels, [Level::Low, Level::High, Level::Low]);
        assert!(writes[2].1 - writes[1].1 >= Duration::from_micros(10));
    }
}
