use clap::{Parser, Subcommand};
use hcsr04_ranger::config::LogFormat;
use hcsr04_ranger::utils::simulated::SimulatedSensor;
use hcsr04_ranger::{logging, CaptureStrategy, SensorDevice, SensorEngine, Settings};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "HC-SR04 ultrasonic rangefinder")]
struct Cli {
    /// TOML settings file, layered over the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured echo capture strategy
    #[arg(short, long, value_enum)]
    strategy: Option<CaptureStrategy>,

    /// Use a simulated sensor with a target at this distance (cm) instead of GPIO
    #[arg(long, value_name = "CM")]
    simulate: Option<f64>,

    /// Override the configured log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the node once
    Read,
    /// Enable periodic mode and print every new reading
    Watch {
        /// Stop after this many readings
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Write stdin lines to the node; an empty line or `r` reads it
    Shell,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(strategy) = cli.strategy {
        settings.capture.strategy = strategy;
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    logging::init(&settings.logging)?;

    let engine = match cli.simulate {
        Some(cm) => {
            info!(cm, "using simulated sensor");
            SensorEngine::simulated(&SimulatedSensor::at_distance(cm), &settings)?
        }
        None => SensorEngine::from_settings(&settings)?,
    };
    let device = SensorDevice::new(engine);

    match cli.command {
        Command::Read => {
            print!("{}", device.open().read_to_string());
        }
        Command::Watch { count } => watch(&device, count)?,
        Command::Shell => shell(&device)?,
    }

    Ok(())
}

fn watch(device: &SensorDevice, count: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = device.engine();
    device.open().write(b"1")?;

    let poll = (engine.period() / 4).max(Duration::from_millis(1));
    let mut last_seq = engine.snapshot().seq;
    let mut printed = 0;
    while count.map_or(true, |count| printed < count) {
        thread::sleep(poll);
        let published = engine.snapshot();
        if published.seq == last_seq {
            continue;
        }
        last_seq = published.seq;

        let measurement = published.measurement;
        let taken_at = measurement
            .taken_at
            .map(|at| at.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_default();
        println!("{taken_at} {:.1} cm", measurement.distance_cm);
        printed += 1;
    }

    device.open().write(b"0")?;
    Ok(())
}

fn shell(device: &SensorDevice) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = device.open();
    let stdout = io::stdout();

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut out = stdout.lock();
        if line.is_empty() || line == "r" {
            handle.rewind();
            write!(out, "{}", handle.read_to_string())?;
        } else {
            match handle.write(line.as_bytes()) {
                Ok(n) => writeln!(out, "wrote {n} bytes")?,
                Err(err) => writeln!(out, "error: {err}")?,
            }
        }
        out.flush()?;
    }

    Ok(())
}
