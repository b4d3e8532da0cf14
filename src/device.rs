//! Byte-stream front end of the engine, shaped like a character device.
//!
//! Reading yields the distance in centimeters as text (`"10.0\n"`), or
//! `"0\n"` when there is no valid reading. Writing `"1"` starts periodic
//! measurement, `"0"` stops it.

use crate::config::{CaptureStrategy, COMMAND_BUFFER_SIZE, OUTPUT_BUFFER_SIZE};
use crate::engine::measurement::Measurement;
use crate::engine::store::Published;
use crate::engine::SensorEngine;
use crate::error::{Result, SensorError};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartPeriodic,
    StopPeriodic,
}

impl Command {
    /// Trailing whitespace and NUL padding are not part of the command, so
    /// `echo 1 > node` works the same as `printf 1 > node`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let end = input
            .iter()
            .rposition(|b| !b.is_ascii_whitespace() && *b != 0)
            .map_or(0, |last| last + 1);
        match &input[..end] {
            b"1" => Ok(Command::StartPeriodic),
            b"0" => Ok(Command::StopPeriodic),
            other => Err(SensorError::InvalidCommand(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

pub fn render(measurement: &Measurement) -> String {
    if measurement.is_ok() {
        format!("{:.1}\n", measurement.distance_cm)
    } else {
        "0\n".to_string()
    }
}

/// The node itself. Hands out one [`DeviceHandle`] per open.
#[derive(Clone)]
pub struct SensorDevice {
    engine: Arc<SensorEngine>,
}

impl SensorDevice {
    pub fn new(engine: SensorEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &SensorEngine {
        &self.engine
    }

    pub fn open(&self) -> DeviceHandle {
        DeviceHandle {
            engine: Arc::clone(&self.engine),
            out_buf: [0; OUTPUT_BUFFER_SIZE],
            len: 0,
            pos: 0,
            rendered_seq: None,
        }
    }
}

pub struct DeviceHandle {
    engine: Arc<SensorEngine>,
    out_buf: [u8; OUTPUT_BUFFER_SIZE],
    len: usize,
    pos: usize,
    rendered_seq: Option<u64>,
}

impl DeviceHandle {
    /// Copies the next bytes of the rendered reading into `buf`. Returns 0
    /// once everything was read, until a newer measurement is published.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.rendered_seq {
            None => self.render(),
            Some(seq) if self.pos >= self.len && self.engine.snapshot().seq != seq => {
                self.render()
            }
            Some(_) => {}
        }

        let n = buf.len().min(self.len - self.pos);
        buf[..n].copy_from_slice(&self.out_buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Reads the whole rendered reading as a string.
    pub fn read_to_string(&mut self) -> String {
        let mut text = Vec::with_capacity(OUTPUT_BUFFER_SIZE);
        let mut chunk = [0u8; OUTPUT_BUFFER_SIZE];
        loop {
            let n = self.read(&mut chunk);
            if n == 0 {
                break;
            }
            text.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&text).into_owned()
    }

    /// Back to position 0; the next read renders a fresh reading.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.rendered_seq = None;
    }

    /// Applies a control command. Unknown commands are accepted and ignored.
    pub fn write(&self, input: &[u8]) -> Result<usize> {
        if input.len() > COMMAND_BUFFER_SIZE {
            return Err(SensorError::OversizedInput {
                len: input.len(),
                capacity: COMMAND_BUFFER_SIZE,
            });
        }

        match Command::parse(input) {
            Ok(Command::StartPeriodic) => {
                if !self.engine.start_periodic() {
                    debug!("periodic measurement already running");
                }
            }
            Ok(Command::StopPeriodic) => {
                if !self.engine.stop_periodic() {
                    debug!("periodic measurement not running");
                }
            }
            Err(err) => debug!(%err, "command ignored, mode unchanged"),
        }
        Ok(input.len())
    }

    fn render(&mut self) {
        let published = match self.engine.strategy() {
            CaptureStrategy::Polling => self.measure_now(),
            CaptureStrategy::EventDriven => self.engine.snapshot(),
        };

        let text = render(&published.measurement);
        self.len = text.len().min(OUTPUT_BUFFER_SIZE);
        self.out_buf[..self.len].copy_from_slice(&text.as_bytes()[..self.len]);
        self.pos = 0;
        self.rendered_seq = Some(published.seq);
    }

    /// Polling deployments measure on read. A timed out cycle reads as "0".
    fn measure_now(&self) -> Published {
        match self.engine.measure_published() {
            Ok(published) => published,
            Err(err) => {
                trace!(%err, "falling back to the stored reading");
                self.engine.snapshot()
            }
        }
    }
}
