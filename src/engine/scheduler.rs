use crossbeam::channel::{bounded, select, tick, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Periodic { period: Duration },
}

/// Re-runs a measurement job on a fixed period until stopped.
///
/// The job runs on a dedicated thread. A tick that arrives while the job is
/// still busy is dropped, not queued.
pub struct MeasurementScheduler {
    worker: Mutex<Option<PeriodicWorker>>,
}

struct PeriodicWorker {
    period: Duration,
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl MeasurementScheduler {
    pub fn new() -> Self {
        Self {
            worker: Mutex::new(None),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<PeriodicWorker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle → Periodic. Returns false, changing nothing, when already periodic.
    pub fn start<F>(&self, period: Duration, job: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut worker = self.worker();
        if worker.is_some() {
            return false;
        }

        let (stop, stop_signal) = bounded(0);
        let thread = thread::spawn(move || periodic_thread_logic(period, stop_signal, job));
        *worker = Some(PeriodicWorker {
            period,
            stop,
            thread,
        });
        info!(?period, "periodic measurement started");
        true
    }

    /// Periodic → Idle, waiting for a running job to finish. Returns false
    /// when already idle.
    pub fn stop(&self) -> bool {
        let Some(worker) = self.worker().take() else {
            return false;
        };

        drop(worker.stop);
        if worker.thread.join().is_err() {
            error!("periodic measurement thread panicked");
        }
        info!("periodic measurement stopped");
        true
    }

    pub fn state(&self) -> SchedulerState {
        match self.worker().as_ref() {
            Some(worker) => SchedulerState::Periodic {
                period: worker.period,
            },
            None => SchedulerState::Idle,
        }
    }
}

impl Default for MeasurementScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MeasurementScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn periodic_thread_logic<F: FnMut()>(period: Duration, stop_signal: Receiver<()>, mut job: F) {
    let ticker = tick(period);
    loop {
        select! {
            recv(stop_signal) -> _ => break,
            recv(ticker) -> _ => job(),
        }
    }
}
