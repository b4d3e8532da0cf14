/// HC-SR04 GPIO Module
///
/// Acquires the trigger and echo lines of an HC-SR04 wired to a Raspberry Pi header.
use crate::config::GpioSettings;
use crate::error::{Result, SensorError};
use crate::gpio::{EdgeHandler, InputLine, Level, OutputLine, PinRole};
use rppal::gpio::{self, Gpio, InputPin, OutputPin, Trigger};
use tracing::debug;

pub struct HcSr04Lines {
    pub trigger: OutputPin,
    pub echo: InputPin,
}

impl HcSr04Lines {
    pub fn acquire(settings: &GpioSettings) -> Result<Self> {
        let unavailable = |role: PinRole, line: u8| {
            move |err: gpio::Error| SensorError::HardwareUnavailable {
                role,
                reason: format!("GPIO {line}: {err}"),
            }
        };

        let chip = Gpio::new().map_err(unavailable(PinRole::Trigger, settings.trigger_pin))?;
        let mut trigger = chip
            .get(settings.trigger_pin)
            .map_err(unavailable(PinRole::Trigger, settings.trigger_pin))?
            .into_output();
        trigger.set_low();
        let echo = chip
            .get(settings.echo_pin)
            .map_err(unavailable(PinRole::Echo, settings.echo_pin))?
            .into_input();

        debug!(
            trigger = settings.trigger_pin,
            echo = settings.echo_pin,
            "acquired HC-SR04 lines"
        );
        Ok(Self { trigger, echo })
    }
}

impl From<gpio::Level> for Level {
    fn from(level: gpio::Level) -> Self {
        match level {
            gpio::Level::Low => Level::Low,
            gpio::Level::High => Level::High,
        }
    }
}

impl OutputLine for OutputPin {
    fn set(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }
}

impl InputLine for InputPin {
    fn level(&self) -> Level {
        self.read().into()
    }

    fn subscribe_edges(&mut self, mut handler: EdgeHandler) -> Result<()> {
        let line = self.pin();
        self.set_async_interrupt(Trigger::Both, move |level| handler(level.into()))
            .map_err(|err| SensorError::HardwareUnavailable {
                role: PinRole::Echo,
                reason: format!("GPIO {line}: {err}"),
            })
    }
}
