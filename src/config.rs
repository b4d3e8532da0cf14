use crate::error::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Overridable from the config file or HCSR04_* environment variables
pub const TRIGGER_PIN: u8 = 27;
pub const ECHO_PIN: u8 = 17;
pub const PERIOD: Duration = Duration::from_secs(1);

// Sensor timing, taken from the HC-SR04 datasheet
pub const PULSE_WIDTH: Duration = Duration::from_micros(10);
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(40);
pub const MICROS_PER_CM: f64 = 58.0;

// Device node buffers
pub const COMMAND_BUFFER_SIZE: usize = 8;
pub const OUTPUT_BUFFER_SIZE: usize = 64;

pub const ENV_PREFIX: &str = "HCSR04_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureStrategy {
    /// Busy-wait on the echo line from the calling thread.
    Polling,
    /// Timestamp echo edges from GPIO interrupt notifications.
    EventDriven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpioSettings {
    /// BCM number of the trigger output.
    pub trigger_pin: u8,
    /// BCM number of the echo input.
    pub echo_pin: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub strategy: CaptureStrategy,
    #[serde(with = "humantime_serde")]
    pub pulse_width: Duration,
    /// Budget for each of the two echo waits.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    /// Enter periodic mode as soon as the engine is built.
    pub start_periodic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub gpio: GpioSettings,
    pub capture: CaptureSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            trigger_pin: TRIGGER_PIN,
            echo_pin: ECHO_PIN,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            strategy: CaptureStrategy::EventDriven,
            pulse_width: PULSE_WIDTH,
            timeout: ECHO_TIMEOUT,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            period: PERIOD,
            start_periodic: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Settings {
    /// Layers built-in defaults, then `path` if given, then `HCSR04_*`
    /// environment variables (`HCSR04_CAPTURE__TIMEOUT=60ms`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that parse but cannot drive the sensor.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.period.is_zero() {
            return Err(figment::Error::from(
                "scheduler.period must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
