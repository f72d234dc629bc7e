//! Runtime settings.
//!
//! Settings come from an optional TOML file, then command-line flags (or
//! their environment variables) override individual fields. Every field has
//! a default, so an empty file is valid.
//!
//! ```toml
//! [printer]
//! base_url = "http://octopi.local"
//! api_key = "0123456789ABCDEF"
//!
//! [strips.status]
//! pin = 18
//! length = 36
//!
//! [strips.progress]
//! pin = 13
//! length = 36
//!
//! [timing]
//! poll_interval_ms = 50
//! error_step_ms = 500
//!
//! [display]
//! brightness = 80
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub printer: PrinterSettings,
    #[serde(default)]
    pub strips: StripsSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

/// Where and how to reach the printer API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrinterSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-Api-Key` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl PrinterSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// One physical strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripSettings {
    /// BCM GPIO number of the data line.
    pub pin: u8,
    /// Number of LEDs.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripsSettings {
    #[serde(default = "default_status_strip")]
    pub status: StripSettings,
    #[serde(default)]
    pub progress: Option<StripSettings>,
}

impl Default for StripsSettings {
    fn default() -> Self {
        Self {
            status: default_status_strip(),
            progress: None,
        }
    }
}

/// Poll cadence and minimum time between animation steps, in ms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fast_step_ms")]
    pub idle_step_ms: u32,
    #[serde(default = "default_error_step_ms")]
    pub error_step_ms: u32,
    #[serde(default = "default_fast_step_ms")]
    pub pause_step_ms: u32,
    #[serde(default = "default_fast_step_ms")]
    pub complete_step_ms: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            idle_step_ms: default_fast_step_ms(),
            error_step_ms: default_error_step_ms(),
            pause_step_ms: default_fast_step_ms(),
            complete_step_ms: default_fast_step_ms(),
        }
    }
}

impl TimingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplaySettings {
    /// Output brightness, 0-100.
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Print the per-cycle report to stdout.
    #[serde(default = "default_true")]
    pub report: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            report: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_status_strip() -> StripSettings {
    StripSettings { pin: 18, length: 36 }
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_fast_step_ms() -> u32 {
    50
}
fn default_error_step_ms() -> u32 {
    500
}
fn default_brightness() -> u8 {
    100
}
fn default_true() -> bool {
    true
}

/// Field overrides from the command line. `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub brightness: Option<u8>,
    pub status_pin: Option<u8>,
    pub status_length: Option<usize>,
    pub progress_pin: Option<u8>,
    pub progress_length: Option<usize>,
    pub no_report: bool,
}

impl Settings {
    /// Parse settings from TOML text without validating them.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides on top of the loaded settings.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.base_url {
            self.printer.base_url = url;
        }
        if let Some(key) = overrides.api_key {
            self.printer.api_key = Some(key);
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.timing.poll_interval_ms = ms;
        }
        if let Some(brightness) = overrides.brightness {
            self.display.brightness = brightness;
        }
        if let Some(pin) = overrides.status_pin {
            self.strips.status.pin = pin;
        }
        if let Some(length) = overrides.status_length {
            self.strips.status.length = length;
        }
        if overrides.progress_pin.is_some() || overrides.progress_length.is_some() {
            // Enabling the progress strip from the CLI alone borrows the
            // status strip's length.
            let mut progress = self.strips.progress.unwrap_or(StripSettings {
                pin: 13,
                length: self.strips.status.length,
            });
            if let Some(pin) = overrides.progress_pin {
                progress.pin = pin;
            }
            if let Some(length) = overrides.progress_length {
                progress.length = length;
            }
            self.strips.progress = Some(progress);
        }
        if overrides.no_report {
            self.display.report = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.printer.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(
                "printer.base_url",
                format!("`{url}` must start with http:// or https://"),
            ));
        }
        if self.printer.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("printer.api_key", "must not be empty when set"));
        }
        if self.printer.request_timeout_ms == 0 {
            return Err(invalid("printer.request_timeout_ms", "must be at least 1"));
        }

        if self.strips.status.length == 0 {
            return Err(invalid("strips.status.length", "must be at least 1"));
        }
        if let Some(progress) = &self.strips.progress {
            if progress.length == 0 {
                return Err(invalid("strips.progress.length", "must be at least 1"));
            }
            if progress.pin == self.strips.status.pin {
                return Err(invalid(
                    "strips.progress.pin",
                    format!("GPIO {} is already used by the status strip", progress.pin),
                ));
            }
        }

        let timing = &self.timing;
        for (field, value) in [
            ("timing.poll_interval_ms", timing.poll_interval_ms),
            ("timing.idle_step_ms", timing.idle_step_ms.into()),
            ("timing.error_step_ms", timing.error_step_ms.into()),
            ("timing.pause_step_ms", timing.pause_step_ms.into()),
            ("timing.complete_step_ms", timing.complete_step_ms.into()),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }

        if self.display.brightness > 100 {
            return Err(invalid(
                "display.brightness",
                format!("{} is above 100", self.display.brightness),
            ));
        }
        Ok(())
    }
}
