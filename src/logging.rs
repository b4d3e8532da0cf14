//! Log output for the `hcsr04` binary.
//!
//! The library only emits `tracing` events. This installs the subscriber
//! that prints them, filtered by `RUST_LOG` when set and by the configured
//! level otherwise.

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{Result, SensorError};
use tracing_subscriber::EnvFilter;

pub fn init(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|err| SensorError::Logging(err.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);

    match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| SensorError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_directive_is_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = LoggingSettings {
            level: "hcsr04_ranger=loud".to_string(),
            format: LogFormat::Compact,
        };
        assert!(matches!(init(&settings), Err(SensorError::Logging(_))));
    }
}
