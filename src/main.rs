//! Printer status lights daemon.
//!
//! Polls the printer API, updates the LED strips, prints a report, sleeps,
//! repeats. Everything runs on one thread: the tokio runtime is
//! `current_thread` and each request is awaited before the next step.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/printer-leds --base-url http://octopi.local --api-key $KEY
//! ./target/release/printer-leds --config printer-leds.toml --dry-run
//! ```

use clap::Parser;
use printer_leds::client::StatusClient;
use printer_leds::config::{Overrides, Settings};
use printer_leds::monitor::Monitor;
use printer_leds::strip::{LedDriver, MemoryDriver};
use printer_leds::ticks::MonotonicClock;
use printer_leds::{Error, is_running, setup_signal_handler};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

/// Mirror a 3D printer's state on addressable LED strips
#[derive(Parser)]
#[command(name = "printer-leds")]
#[command(version)]
struct Args {
    /// TOML settings file; flags below override its values
    #[arg(long, env = "PRINTER_LEDS_CONFIG")]
    config: Option<PathBuf>,

    /// Printer API base URL, e.g. http://octopi.local
    #[arg(long, env = "PRINTER_BASE_URL")]
    base_url: Option<String>,

    /// API key sent as X-Api-Key
    #[arg(long, env = "PRINTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sleep between polls, in milliseconds
    #[arg(long, env = "PRINTER_LEDS_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// LED brightness (0-100)
    #[arg(long, env = "PRINTER_LEDS_BRIGHTNESS", value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: Option<u8>,

    /// GPIO pin of the status strip
    #[arg(long, env = "PRINTER_LEDS_STATUS_PIN")]
    status_pin: Option<u8>,

    /// Number of LEDs on the status strip
    #[arg(long, env = "PRINTER_LEDS_STATUS_LENGTH")]
    status_length: Option<usize>,

    /// GPIO pin of the progress strip (enables it)
    #[arg(long, env = "PRINTER_LEDS_PROGRESS_PIN")]
    progress_pin: Option<u8>,

    /// Number of LEDs on the progress strip (enables it)
    #[arg(long, env = "PRINTER_LEDS_PROGRESS_LENGTH")]
    progress_length: Option<usize>,

    /// Do not print the per-cycle report
    #[arg(long)]
    no_report: bool,

    /// Keep frames in memory instead of driving the strips
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn settings(&self) -> Result<Settings, Error> {
        let mut settings = Settings::load(self.config.as_deref())?;
        settings.apply(Overrides {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            poll_interval_ms: self.poll_interval_ms,
            brightness: self.brightness,
            status_pin: self.status_pin,
            status_length: self.status_length,
            progress_pin: self.progress_pin,
            progress_length: self.progress_length,
            no_report: self.no_report,
        });
        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run(args: Args) -> Result<(), Error> {
    let settings = args.settings()?;
    let client = StatusClient::new(&settings.printer)?;
    let running = setup_signal_handler()?;
    let clock = MonotonicClock::new();

    tracing::info!("printer-leds v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Printer: {}", client.base_url());
    tracing::info!(
        "Status strip: {} LEDs on GPIO {}",
        settings.strips.status.length,
        settings.strips.status.pin
    );
    if let Some(progress) = &settings.strips.progress {
        tracing::info!("Progress strip: {} LEDs on GPIO {}", progress.length, progress.pin);
    }
    tracing::info!("Poll interval: {}ms", settings.timing.poll_interval_ms);

    #[cfg(feature = "hardware")]
    if !args.dry_run {
        let driver = printer_leds::strip::Ws281xDriver::new(
            &settings.strips.status,
            settings.strips.progress.as_ref(),
        )?;
        let monitor = Monitor::new(driver, &settings, clock.now());
        return poll_loop(monitor, &client, &settings, &clock, &running).await;
    }

    #[cfg(not(feature = "hardware"))]
    if !args.dry_run {
        tracing::warn!("Built without the `hardware` feature; frames stay in memory");
    }

    let driver = MemoryDriver::for_strips(&settings.strips.status, settings.strips.progress.as_ref());
    let monitor = Monitor::new(driver, &settings, clock.now());
    poll_loop(monitor, &client, &settings, &clock, &running).await
}

async fn poll_loop<D: LedDriver>(
    mut monitor: Monitor<D>,
    client: &StatusClient,
    settings: &Settings,
    clock: &MonotonicClock,
    running: &AtomicBool,
) -> Result<(), Error> {
    let interval = settings.timing.poll_interval();

    while is_running(running) {
        let poll = client.poll().await;
        let cycle = monitor.cycle(poll, clock.now());
        if settings.display.report {
            println!("{}", cycle.report);
        }
        tokio::time::sleep(interval).await;
    }

    tracing::info!("Shutting down, blanking strips");
    monitor.blank()
}
