//! LED strips: frame buffers and the "set pixel, then flush" driver seam.
//!
//! A [`Frame`] is the in-memory buffer for one strip. A [`LedDriver`] takes
//! pixels one at a time and pushes every strip to the hardware on
//! [`LedDriver::flush`]. Two drivers exist:
//! - [`MemoryDriver`]: keeps the last flushed frames, used by tests and
//!   `--dry-run`
//! - `Ws281xDriver` (feature `hardware`): WS2812 strips on the Raspberry Pi
//!   PWM channels via `rs_ws281x`

use crate::config::StripSettings;
use crate::{Color, Error};

/// Which physical strip a frame belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StripRole {
    /// Job state animations and temperature colors.
    Status,
    /// Job completion bar.
    Progress,
}

impl StripRole {
    /// Driver channel this role is wired to.
    pub fn channel(self) -> usize {
        match self {
            StripRole::Status => 0,
            StripRole::Progress => 1,
        }
    }
}

/// Fixed-length buffer of colors, one per LED.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<Color>,
}

impl Frame {
    /// A dark frame for a strip of `len` LEDs.
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Color::OFF; len],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.pixels.get(index).copied()
    }

    /// Set one pixel. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn clear(&mut self) {
        self.fill(Color::OFF);
    }

    /// Number of pixels that are not off.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|c| !c.is_off()).count()
    }
}

/// Output seam for LED hardware.
pub trait LedDriver {
    /// Stage one pixel. Nothing reaches the LEDs until [`flush`](Self::flush).
    fn set_pixel(&mut self, role: StripRole, index: usize, color: Color);

    /// Push every staged pixel of every strip out to the LEDs.
    fn flush(&mut self) -> Result<(), Error>;
}

/// Stage a whole frame, scaled by `brightness` (0-100).
pub fn stage_frame<D: LedDriver + ?Sized>(
    driver: &mut D,
    role: StripRole,
    frame: &Frame,
    brightness: u8,
) {
    for (i, color) in frame.pixels().iter().enumerate() {
        driver.set_pixel(role, i, color.apply_brightness(brightness));
    }
}

// ── In-memory driver ─────────────────────────────────────────────────

/// Driver that keeps frames in memory.
///
/// `staged` holds pixels set since the last flush; `flushed` holds what the
/// LEDs would currently show.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    staged: [Vec<Color>; 2],
    flushed: [Vec<Color>; 2],
    flush_count: usize,
    fail_flushes: bool,
}

impl MemoryDriver {
    pub fn new(status_len: usize, progress_len: Option<usize>) -> Self {
        let progress_len = progress_len.unwrap_or(0);
        Self {
            staged: [vec![Color::OFF; status_len], vec![Color::OFF; progress_len]],
            flushed: [vec![Color::OFF; status_len], vec![Color::OFF; progress_len]],
            flush_count: 0,
            fail_flushes: false,
        }
    }

    pub fn for_strips(status: &StripSettings, progress: Option<&StripSettings>) -> Self {
        Self::new(status.length, progress.map(|p| p.length))
    }

    /// Make every following flush fail, as a wedged DMA channel would.
    pub fn fail_flushes(&mut self, fail: bool) {
        self.fail_flushes = fail;
    }

    /// What the given strip currently shows.
    pub fn shown(&self, role: StripRole) -> &[Color] {
        &self.flushed[role.channel()]
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl LedDriver for MemoryDriver {
    fn set_pixel(&mut self, role: StripRole, index: usize, color: Color) {
        if let Some(pixel) = self.staged[role.channel()].get_mut(index) {
            *pixel = color;
        }
    }

    fn flush(&mut self) -> Result<(), Error> {
        if self.fail_flushes {
            return Err(Error::HardwareWrite("memory driver set to fail".into()));
        }
        self.flushed = self.staged.clone();
        self.flush_count += 1;
        tracing::trace!(flush = self.flush_count, "frame flushed");
        Ok(())
    }
}

// ── Hardware driver ──────────────────────────────────────────────────

#[cfg(feature = "hardware")]
pub use hardware::Ws281xDriver;

#[cfg(feature = "hardware")]
mod hardware {
    use super::{LedDriver, StripRole};
    use crate::config::StripSettings;
    use crate::{Color, Error};
    use rs_ws281x::{ChannelBuilder, Controller, ControllerBuilder, StripType};

    const FREQ_HZ: u32 = 800_000;
    const DMA_CHANNEL: i32 = 10;

    /// Convert our Color to the driver's raw little-endian BGRW word.
    fn raw(c: Color) -> [u8; 4] {
        [c.b, c.g, c.r, 0]
    }

    /// WS2812 strips on the Pi's two PWM channels.
    pub struct Ws281xDriver {
        controller: Controller,
        has_progress: bool,
    }

    impl Ws281xDriver {
        fn has(&self, role: StripRole) -> bool {
            role == StripRole::Status || self.has_progress
        }
    }

    impl Ws281xDriver {
        /// Claim the output pins and DMA channel.
        ///
        /// Fails when not running as root or when a pin cannot drive PWM.
        pub fn new(status: &StripSettings, progress: Option<&StripSettings>) -> Result<Self, Error> {
            let mut builder = ControllerBuilder::new();
            builder.freq(FREQ_HZ).dma(DMA_CHANNEL).channel(
                StripRole::Status.channel(),
                ChannelBuilder::new()
                    .pin(status.pin as i32)
                    .count(status.length as i32)
                    .strip_type(StripType::Ws2812)
                    .brightness(255)
                    .build(),
            );
            if let Some(progress) = progress {
                builder.channel(
                    StripRole::Progress.channel(),
                    ChannelBuilder::new()
                        .pin(progress.pin as i32)
                        .count(progress.length as i32)
                        .strip_type(StripType::Ws2812)
                        .brightness(255)
                        .build(),
                );
            }

            let controller = builder
                .build()
                .map_err(|e| Error::HardwareInit(format!("{e:?}")))?;
            Ok(Self {
                controller,
                has_progress: progress.is_some(),
            })
        }
    }

    impl LedDriver for Ws281xDriver {
        fn set_pixel(&mut self, role: StripRole, index: usize, color: Color) {
            if !self.has(role) {
                return;
            }
            if let Some(led) = self.controller.leds_mut(role.channel()).get_mut(index) {
                *led = raw(color);
            }
        }

        fn flush(&mut self) -> Result<(), Error> {
            self.controller
                .render()
                .map_err(|e| Error::HardwareWrite(format!("{e:?}")))
        }
    }

    impl Drop for Ws281xDriver {
        fn drop(&mut self) {
            for role in [StripRole::Status, StripRole::Progress] {
                if self.has(role) {
                    self.controller.leds_mut(role.channel()).fill([0, 0, 0, 0]);
                }
            }
            let _ = self.controller.render();
        }
    }
}
