//! Printer status lights.
//!
//! Polls a 3D printer's HTTP API and mirrors its job state and bed
//! temperature on one or two addressable LED strips:
//! - Color policy for temperatures and progress
//! - Non-blocking animation stepper (one step per poll cycle at most)
//! - Status client for the two printer endpoints
//! - The monitor that ties a poll result to a frame on the strip
//!
//! Hardware output lives behind the `hardware` feature so everything else
//! builds and tests on any host.

pub mod animation;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod policy;
pub mod report;
pub mod status;
pub mod strip;
pub mod ticks;

pub use error::Error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Color ──────────────────────────────────────────────────────────

/// RGB color, decoupled from the LED driver crate.
///
/// Conversion to the driver's raw pixel format happens at the strip
/// boundary, so color logic tests run without any hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const ORANGE: Color = Color::new(255, 165, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::OFF
    }
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets the returned flag to false.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_new() {
        let c = Color::new(10, 20, 30);
        assert_eq!(c.r, 10);
        assert_eq!(c.g, 20);
        assert_eq!(c.b, 30);
    }

    #[test]
    fn default_color_is_off() {
        assert!(Color::default().is_off());
        assert!(!Color::RED.is_off());
    }

    #[test]
    fn apply_brightness_100_is_identity() {
        let c = Color::new(100, 200, 50);
        assert_eq!(c.apply_brightness(100), c);
    }

    #[test]
    fn apply_brightness_above_100_is_identity() {
        let c = Color::new(100, 200, 50);
        assert_eq!(c.apply_brightness(255), c);
    }

    #[test]
    fn apply_brightness_0_is_black() {
        assert_eq!(Color::WHITE.apply_brightness(0), Color::OFF);
    }

    #[test]
    fn apply_brightness_50_halves() {
        let c = Color::new(200, 100, 50);
        assert_eq!(c.apply_brightness(50), Color::new(100, 50, 25));
    }

    #[test]
    fn is_running_reads_flag() {
        let flag = AtomicBool::new(true);
        assert!(is_running(&flag));
        flag.store(false, Ordering::SeqCst);
        assert!(!is_running(&flag));
    }
}
