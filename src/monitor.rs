//! One iteration of the main loop: poll result in, frame out.
//!
//! The monitor owns the LED driver and the [`DeviceState`]. It does no I/O
//! of its own besides flushing the driver, so the async poll and the sleep
//! stay in `main` and every cycle can be driven from tests with a fixed
//! clock.

use crate::animation::{AnimationKind, DeviceState};
use crate::config::{Settings, TimingSettings};
use crate::error::Error;
use crate::policy::{WARM_BED_C, color_for_temperature, printing_accent, render_progress};
use crate::report::Report;
use crate::status::{JobState, PrinterSnapshot};
use crate::strip::{LedDriver, StripRole, stage_frame};
use crate::ticks::Ticks;
use crate::Color;

/// What the status strip should show for a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scene {
    /// Printer idle with a warm bed: solid temperature color.
    BedTemperature(Color),
    /// Job running: solid accent, no effect.
    Printing(Color),
    /// Time-gated effect.
    Animate(AnimationKind),
}

impl Scene {
    pub fn for_snapshot(snapshot: &PrinterSnapshot) -> Self {
        let bed = snapshot.telemetry.bed_temp;
        match snapshot.state {
            JobState::Operational => match bed {
                Some(t) if t >= WARM_BED_C => Scene::BedTemperature(color_for_temperature(t)),
                _ => Scene::Animate(AnimationKind::Idle),
            },
            JobState::Printing => Scene::Printing(printing_accent(bed)),
            state => Scene::Animate(AnimationKind::for_state(state)),
        }
    }
}

/// What happened to the strips during a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Poll failed; LEDs left alone.
    Skipped,
    /// Nothing changed (e.g. waiting for the next animation step).
    Unchanged,
    Written,
    WriteFailed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cycle {
    pub report: Report,
    pub output: Output,
}

pub struct Monitor<D: LedDriver> {
    driver: D,
    timing: TimingSettings,
    brightness: u8,
    state: DeviceState,
    snapshot: PrinterSnapshot,
    needs_flush: bool,
}

impl<D: LedDriver> Monitor<D> {
    pub fn new(driver: D, settings: &Settings, now: Ticks) -> Self {
        let strips = &settings.strips;
        Self {
            driver,
            timing: settings.timing.clone(),
            brightness: settings.display.brightness,
            state: DeviceState::new(strips.status.length, strips.progress.map(|p| p.length), now),
            snapshot: PrinterSnapshot::default(),
            needs_flush: true,
        }
    }

    pub fn device(&self) -> &DeviceState {
        &self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Latest known printer state.
    pub fn snapshot(&self) -> &PrinterSnapshot {
        &self.snapshot
    }

    /// Run one loop iteration with this cycle's poll result.
    pub fn cycle(&mut self, poll: Result<PrinterSnapshot, Error>, now: Ticks) -> Cycle {
        let output = match poll {
            Ok(snapshot) => {
                if snapshot.state != self.snapshot.state {
                    tracing::info!(from = %self.snapshot.state, to = %snapshot.state, "job state changed");
                }
                self.snapshot = snapshot;
                self.update(now)
            }
            Err(err) => {
                tracing::warn!(error = %err, "printer poll failed, keeping last state");
                Output::Skipped
            }
        };

        Cycle {
            report: Report {
                snapshot: self.snapshot,
                stale: output == Output::Skipped,
            },
            output,
        }
    }

    fn update(&mut self, now: Ticks) -> Output {
        let state = std::mem::take(&mut self.state);
        let before = state.clone();

        let mut state = match Scene::for_snapshot(&self.snapshot) {
            Scene::BedTemperature(color) => {
                let mut state = state.hold(color, now);
                state.cursor.reset(AnimationKind::Idle, now);
                state
            }
            Scene::Printing(color) => state.hold(color, now),
            Scene::Animate(kind) => {
                let (state, _) = state.advance(kind, now, kind.interval_ms(&self.timing));
                state
            }
        };

        if let Some(frame) = state.progress.as_mut() {
            match self.snapshot.state {
                JobState::Printing | JobState::Paused => {
                    render_progress(self.snapshot.telemetry.job_percentage, frame)
                }
                JobState::Completed => render_progress(100.0, frame),
                _ => frame.clear(),
            }
        }

        if state.cursor.kind != before.cursor.kind {
            tracing::debug!(from = ?before.cursor.kind, to = ?state.cursor.kind, "animation switched");
        }

        let changed = state.status != before.status || state.progress != before.progress;
        self.state = state;

        if changed || self.needs_flush {
            self.write()
        } else {
            Output::Unchanged
        }
    }

    fn write(&mut self) -> Output {
        stage_frame(&mut self.driver, StripRole::Status, &self.state.status, self.brightness);
        if let Some(frame) = &self.state.progress {
            stage_frame(&mut self.driver, StripRole::Progress, frame, self.brightness);
        }

        match self.driver.flush() {
            Ok(()) => {
                self.needs_flush = false;
                Output::Written
            }
            Err(err) => {
                tracing::error!(error = %err, "LED write failed, retrying next cycle");
                self.needs_flush = true;
                Output::WriteFailed
            }
        }
    }

    /// Darken every strip. Used on shutdown.
    pub fn blank(&mut self) -> Result<(), Error> {
        self.state.status.clear();
        if let Some(frame) = self.state.progress.as_mut() {
            frame.clear();
        }
        stage_frame(&mut self.driver, StripRole::Status, &self.state.status, self.brightness);
        if let Some(frame) = &self.state.progress {
            stage_frame(&mut self.driver, StripRole::Progress, frame, self.brightness);
        }
        self.driver.flush()
    }
}
