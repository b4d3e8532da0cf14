//! Echo pulse capture.
//!
//! Two strategies measure how long the echo line stays high after a trigger
//! pulse. [`PollingCapture`] spins on the line from the calling thread;
//! [`EdgeCapture`] lets GPIO edge notifications stamp the window while the
//! calling thread only watches the clock. A deployment picks one through
//! [`CaptureStrategy`]; they are never mixed inside one cycle.

mod edge;
mod polling;
mod window;

pub use edge::EdgeCapture;
pub use polling::PollingCapture;
pub use window::CaptureWindow;

use super::pulse::PulseGenerator;
use super::store::{Published, ResultStore};
use crate::config::CaptureStrategy;
use crate::error::Result;
use crate::gpio::InputLine;
use std::time::Duration;

pub trait EchoCapture: Send + Sync {
    /// Fires `pulse` and times the echo, giving each of the two waits
    /// (rising edge, then falling edge) up to `timeout`.
    ///
    /// On success the measurement has already been published to `store`,
    /// under the returned sequence number.
    /// Fails with `CaptureTimeout` when either wait runs out, leaving
    /// `store` untouched.
    fn capture(
        &self,
        pulse: &mut PulseGenerator,
        timeout: Duration,
        store: &ResultStore,
    ) -> Result<Published>;
}

pub fn for_strategy(
    strategy: CaptureStrategy,
    echo: Box<dyn InputLine>,
) -> Result<Box<dyn EchoCapture>> {
    Ok(match strategy {
        CaptureStrategy::Polling => Box::new(PollingCapture::new(echo)),
        CaptureStrategy::EventDriven => Box::new(EdgeCapture::new(echo)?),
    })
}
