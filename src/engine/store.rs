use super::measurement::Measurement;
use crossbeam::sync::ShardedLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

/// A measurement together with the number of publications before it
/// (inclusive). Lets readers tell a fresh value from one already seen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Published {
    pub seq: u64,
    pub measurement: Measurement,
}

/// Latest completed measurement plus the single-flight flag.
///
/// Cloning hands out another reference to the same store, which is how the
/// edge handler publishes from the notification thread.
#[derive(Clone, Default)]
pub struct ResultStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    latest: ShardedLock<Published>,
    in_flight: AtomicBool,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, measurement: Measurement) -> u64 {
        let mut latest = self
            .inner
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        latest.seq += 1;
        latest.measurement = measurement;
        latest.seq
    }

    pub fn current(&self) -> Measurement {
        self.snapshot().measurement
    }

    pub fn snapshot(&self) -> Published {
        *self
            .inner
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the right to run a capture cycle. `None` while another cycle
    /// holds it.
    pub fn begin_capture(&self) -> Option<CaptureGuard> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureGuard {
                inner: Arc::clone(&self.inner),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the whole of one capture cycle; dropping it ends the flight.
#[must_use = "the capture ends as soon as the guard is dropped"]
pub struct CaptureGuard {
    inner: Arc<Inner>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}
