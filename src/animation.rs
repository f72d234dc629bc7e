//! Non-blocking animation stepper.
//!
//! Every effect is a pure function of `(kind, step, strip length)`: it
//! paints a complete frame and never sleeps. The main loop calls
//! [`DeviceState::advance`] once per poll cycle, and the cursor decides
//! whether enough time has passed for the next step.
//!
//! Step counters are always bounded (see [`next_step`]), so a printer that
//! sits in one state for weeks never overflows anything.

use crate::Color;
use crate::config::TimingSettings;
use crate::status::JobState;
use crate::strip::Frame;
use crate::ticks::Ticks;

/// Steps in one trip around the color wheel.
pub const WHEEL_STEPS: u32 = 256;

/// Which effect the status strip is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationKind {
    /// No effect running; the strip shows a static color.
    #[default]
    None,
    /// Rainbow color wheel.
    Idle,
    /// Red / off flash.
    Error,
    /// Bouncing single pixel.
    Pause,
    /// Fill, drain, then solid green.
    Complete,
}

impl AnimationKind {
    /// Effect for a job state. Printing has none; it shows a static color.
    pub fn for_state(state: JobState) -> Self {
        match state {
            JobState::Printing => AnimationKind::None,
            JobState::Error => AnimationKind::Error,
            JobState::Paused => AnimationKind::Pause,
            JobState::Completed => AnimationKind::Complete,
            JobState::Operational | JobState::Unknown => AnimationKind::Idle,
        }
    }

    /// Minimum time between two steps.
    pub fn interval_ms(self, timing: &TimingSettings) -> u32 {
        match self {
            AnimationKind::None => 0,
            AnimationKind::Idle => timing.idle_step_ms,
            AnimationKind::Error => timing.error_step_ms,
            AnimationKind::Pause => timing.pause_step_ms,
            AnimationKind::Complete => timing.complete_step_ms,
        }
    }
}

// ── Cursor ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AnimationCursor {
    pub kind: AnimationKind,
    pub step: u32,
    /// When the last step ran (or when `kind` last changed).
    pub last_tick: Ticks,
}

impl AnimationCursor {
    pub fn new(now: Ticks) -> Self {
        Self {
            kind: AnimationKind::None,
            step: 0,
            last_tick: now,
        }
    }

    /// Start `kind` from step 0.
    pub fn reset(&mut self, kind: AnimationKind, now: Ticks) {
        self.kind = kind;
        self.step = 0;
        self.last_tick = now;
    }

    pub fn is_due(&self, now: Ticks, interval_ms: u32) -> bool {
        now.since(self.last_tick) >= interval_ms
    }
}

// ── Device state ─────────────────────────────────────────────────────

/// Everything the stepper owns: the cursor and the strip buffers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub cursor: AnimationCursor,
    pub status: Frame,
    pub progress: Option<Frame>,
}

/// What a call to [`DeviceState::advance`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Switched to a new effect and painted its first frame.
    Started,
    /// Painted the next frame of the running effect.
    Stepped,
    /// Interval not yet elapsed; frame untouched.
    Waiting,
}

impl DeviceState {
    pub fn new(status_len: usize, progress_len: Option<usize>, now: Ticks) -> Self {
        Self {
            cursor: AnimationCursor::new(now),
            status: Frame::new(status_len),
            progress: progress_len.map(Frame::new),
        }
    }

    /// Run `kind` on the status strip for this cycle.
    ///
    /// A change of kind resets the cursor and paints step 0 right away.
    /// Otherwise one step is painted only if `interval_ms` has elapsed
    /// since the previous one.
    pub fn advance(mut self, kind: AnimationKind, now: Ticks, interval_ms: u32) -> (Self, Advance) {
        let outcome = if self.cursor.kind != kind {
            self.cursor.reset(kind, now);
            Advance::Started
        } else if self.cursor.is_due(now, interval_ms) {
            Advance::Stepped
        } else {
            return (self, Advance::Waiting);
        };

        let len = self.status.len();
        render(kind, self.cursor.step, &mut self.status);
        self.cursor.step = next_step(kind, self.cursor.step, len);
        self.cursor.last_tick = now;
        (self, outcome)
    }

    /// Paint a static color and stop any running effect.
    pub fn hold(mut self, color: Color, now: Ticks) -> Self {
        self.status.fill(color);
        self.cursor.reset(AnimationKind::None, now);
        self
    }
}

// ── Step functions ───────────────────────────────────────────────────

/// Paint frame `step` of `kind` into `frame`, overwriting every pixel.
pub fn render(kind: AnimationKind, step: u32, frame: &mut Frame) {
    match kind {
        AnimationKind::None => {}
        AnimationKind::Idle => render_idle(step, frame),
        AnimationKind::Error => render_error(step, frame),
        AnimationKind::Pause => render_pause(step, frame),
        AnimationKind::Complete => render_complete(step, frame),
    }
}

/// Step that follows `step`, kept inside the effect's cycle.
pub fn next_step(kind: AnimationKind, step: u32, len: usize) -> u32 {
    match kind {
        AnimationKind::None => 0,
        AnimationKind::Idle => step.wrapping_add(1) % WHEEL_STEPS,
        AnimationKind::Error => step.wrapping_add(1) % 2,
        AnimationKind::Pause => step.wrapping_add(1) % pause_period(len),
        AnimationKind::Complete => step.saturating_add(1).min(complete_hold_step(len)),
    }
}

/// Color wheel: red → green → blue → red over 256 positions.
pub fn wheel(pos: u8) -> Color {
    match pos {
        0..=84 => Color::new(pos * 3, 255 - pos * 3, 0),
        85..=169 => {
            let p = pos - 85;
            Color::new(255 - p * 3, 0, p * 3)
        }
        _ => {
            let p = pos - 170;
            Color::new(0, p * 3, 255 - p * 3)
        }
    }
}

fn render_idle(step: u32, frame: &mut Frame) {
    for (i, pixel) in frame.pixels_mut().iter_mut().enumerate() {
        let pos = (i as u32).wrapping_add(step) % WHEEL_STEPS;
        *pixel = wheel(pos as u8);
    }
}

fn render_error(step: u32, frame: &mut Frame) {
    frame.fill(if step % 2 == 0 { Color::RED } else { Color::OFF });
}

/// Direction of the pause comet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Steps for one round trip of the comet.
fn pause_period(len: usize) -> u32 {
    if len <= 1 { 1 } else { 2 * (len as u32 - 1) }
}

/// Comet position and heading at `step` on a strip of `len` LEDs.
///
/// Forward from 0 up to `len - 2`, then backward from `len - 1` down to 1,
/// so the heading flips exactly at the two end pixels.
pub fn pause_position(step: u32, len: usize) -> (usize, Direction) {
    if len <= 1 {
        return (0, Direction::Forward);
    }
    let period = pause_period(len);
    let s = step % period;
    let last = len as u32 - 1;
    if s < last {
        (s as usize, Direction::Forward)
    } else {
        ((period - s) as usize, Direction::Backward)
    }
}

fn render_pause(step: u32, frame: &mut Frame) {
    let (pos, direction) = pause_position(step, frame.len());
    frame.clear();
    frame.set(
        pos,
        match direction {
            Direction::Forward => Color::GREEN,
            Direction::Backward => Color::BLUE,
        },
    );
}

/// First step of the solid-green hold phase.
fn complete_hold_step(len: usize) -> u32 {
    2 * len as u32
}

/// How many LEDs, counted from index 0, the completion effect lights.
pub fn complete_lit(step: u32, len: usize) -> usize {
    let n = len as u32;
    if step < n {
        step as usize + 1
    } else if step < 2 * n {
        (2 * n - step - 1) as usize
    } else {
        len
    }
}

fn render_complete(step: u32, frame: &mut Frame) {
    let lit = complete_lit(step, frame.len());
    for (i, pixel) in frame.pixels_mut().iter_mut().enumerate() {
        *pixel = if i < lit { Color::GREEN } else { Color::OFF };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const LEN: usize = 36;

    fn frame_at(kind: AnimationKind, step: u32, len: usize) -> Frame {
        let mut frame = Frame::new(len);
        render(kind, step, &mut frame);
        frame
    }

    fn timing() -> TimingSettings {
        TimingSettings::default()
    }

    // ── wheel / idle ───────────────────────────────────────────────

    #[rstest]
    #[case(0, Color::new(0, 255, 0))]
    #[case(84, Color::new(252, 3, 0))]
    #[case(85, Color::new(255, 0, 0))]
    #[case(170, Color::new(0, 0, 255))]
    #[case(255, Color::new(0, 255, 0))]
    fn wheel_positions(#[case] pos: u8, #[case] expected: Color) {
        assert_eq!(wheel(pos), expected);
    }

    #[test]
    fn idle_is_periodic_in_256_steps() {
        for step in 0..600 {
            assert_eq!(
                frame_at(AnimationKind::Idle, step, LEN),
                frame_at(AnimationKind::Idle, step + WHEEL_STEPS, LEN),
                "step {step}"
            );
        }
    }

    #[test]
    fn idle_shifts_wheel_by_one_per_step() {
        let a = frame_at(AnimationKind::Idle, 10, LEN);
        let b = frame_at(AnimationKind::Idle, 11, LEN);
        assert_eq!(a.get(1), b.get(0));
        assert_eq!(a.get(0), Some(wheel(10)));
    }

    #[test]
    fn idle_step_wraps_at_256() {
        assert_eq!(next_step(AnimationKind::Idle, 254, LEN), 255);
        assert_eq!(next_step(AnimationKind::Idle, 255, LEN), 0);
    }

    // ── error ──────────────────────────────────────────────────────

    #[test]
    fn error_alternates_red_and_off() {
        let red = frame_at(AnimationKind::Error, 0, 4);
        let off = frame_at(AnimationKind::Error, 1, 4);
        assert!(red.pixels().iter().all(|&c| c == Color::RED));
        assert_eq!(off.lit_count(), 0);
        assert_eq!(next_step(AnimationKind::Error, 1, 4), 0);
    }

    // ── pause ──────────────────────────────────────────────────────

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(36)]
    fn pause_stays_on_strip_and_flips_at_ends(#[case] len: usize) {
        let mut step = 0;
        let mut previous: Option<(usize, Direction)> = None;
        for _ in 0..500 {
            let (pos, dir) = pause_position(step, len);
            assert!(pos < len);
            if pos == 0 {
                assert_eq!(dir, Direction::Forward);
            }
            if len > 1 && pos == len - 1 {
                assert_eq!(dir, Direction::Backward);
            }
            if let Some((prev_pos, prev_dir)) = previous {
                if prev_dir != dir {
                    assert!(prev_pos == 0 || prev_pos == len - 2 || prev_pos == 1);
                    assert!(pos == 0 || pos == len - 1);
                }
            }
            previous = Some((pos, dir));
            step = next_step(AnimationKind::Pause, step, len);
            assert!(step < pause_period(len));
        }
    }

    #[test]
    fn pause_lights_exactly_one_pixel() {
        let forward = frame_at(AnimationKind::Pause, 3, 5);
        assert_eq!(forward.lit_count(), 1);
        assert_eq!(forward.get(3), Some(Color::GREEN));

        let backward = frame_at(AnimationKind::Pause, 5, 5);
        assert_eq!(backward.lit_count(), 1);
        assert_eq!(backward.get(3), Some(Color::BLUE));
    }

    #[test]
    fn pause_full_bounce_on_four_leds() {
        let positions: Vec<usize> = (0..8).map(|s| pause_position(s, 4).0).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 2, 1, 0, 1]);
    }

    // ── complete ───────────────────────────────────────────────────

    #[test]
    fn complete_fills_then_drains_then_holds() {
        let n = 4;
        let lit: Vec<usize> = (0..10).map(|s| complete_lit(s, n)).collect();
        assert_eq!(lit, vec![1, 2, 3, 4, 3, 2, 1, 0, 4, 4]);
    }

    #[test]
    fn complete_never_overruns_the_strip() {
        for step in 0..(4 * LEN as u32) {
            let frame = frame_at(AnimationKind::Complete, step, LEN);
            assert_eq!(frame.len(), LEN);
            assert!(complete_lit(step, LEN) <= LEN);
        }
        let far = frame_at(AnimationKind::Complete, u32::MAX, LEN);
        assert!(far.pixels().iter().all(|&c| c == Color::GREEN));
    }

    #[test]
    fn complete_step_saturates_in_hold_phase() {
        let hold = complete_hold_step(LEN);
        assert_eq!(next_step(AnimationKind::Complete, hold - 1, LEN), hold);
        assert_eq!(next_step(AnimationKind::Complete, hold, LEN), hold);
    }

    // ── idempotence ────────────────────────────────────────────────

    #[rstest]
    #[case(AnimationKind::Idle)]
    #[case(AnimationKind::Error)]
    #[case(AnimationKind::Pause)]
    #[case(AnimationKind::Complete)]
    fn rendering_the_same_step_twice_is_identical(#[case] kind: AnimationKind) {
        for step in [0, 1, 7, 35, 71, 72, 255] {
            let mut frame = frame_at(kind, step, LEN);
            let first = frame.clone();
            render(kind, step, &mut frame);
            assert_eq!(frame, first);
        }
    }

    // ── cursor / device state ──────────────────────────────────────

    #[test]
    fn state_mapping() {
        assert_eq!(AnimationKind::for_state(JobState::Printing), AnimationKind::None);
        assert_eq!(AnimationKind::for_state(JobState::Error), AnimationKind::Error);
        assert_eq!(AnimationKind::for_state(JobState::Paused), AnimationKind::Pause);
        assert_eq!(AnimationKind::for_state(JobState::Completed), AnimationKind::Complete);
        assert_eq!(AnimationKind::for_state(JobState::Unknown), AnimationKind::Idle);
        assert_eq!(AnimationKind::for_state(JobState::Operational), AnimationKind::Idle);
    }

    #[test]
    fn intervals_come_from_timing() {
        let t = timing();
        assert_eq!(AnimationKind::Error.interval_ms(&t), 500);
        assert_eq!(AnimationKind::Pause.interval_ms(&t), 50);
        assert_eq!(AnimationKind::Complete.interval_ms(&t), 50);
        assert_eq!(AnimationKind::Idle.interval_ms(&t), 50);
    }

    #[test]
    fn switching_kind_resets_and_paints_immediately() {
        let state = DeviceState::new(4, None, Ticks(0));
        let (state, outcome) = state.advance(AnimationKind::Error, Ticks(10), 500);
        assert_eq!(outcome, Advance::Started);
        assert_eq!(state.cursor.kind, AnimationKind::Error);
        assert_eq!(state.cursor.step, 1);
        assert_eq!(state.cursor.last_tick, Ticks(10));
        assert!(state.status.pixels().iter().all(|&c| c == Color::RED));
    }

    #[test]
    fn steps_wait_for_their_interval() {
        let state = DeviceState::new(4, None, Ticks(0));
        let (state, _) = state.advance(AnimationKind::Error, Ticks(0), 500);
        let before = state.clone();

        let (state, outcome) = state.advance(AnimationKind::Error, Ticks(499), 500);
        assert_eq!(outcome, Advance::Waiting);
        assert_eq!(state, before);

        let (state, outcome) = state.advance(AnimationKind::Error, Ticks(500), 500);
        assert_eq!(outcome, Advance::Stepped);
        assert_eq!(state.status.lit_count(), 0);
        assert_eq!(state.cursor.last_tick, Ticks(500));
    }

    #[test]
    fn gating_survives_tick_wraparound() {
        let start = Ticks(u32::MAX - 20);
        let state = DeviceState::new(4, None, start);
        let (state, _) = state.advance(AnimationKind::Pause, start, 50);
        let (_, outcome) = state.advance(AnimationKind::Pause, start.wrapping_add_ms(50), 50);
        assert_eq!(outcome, Advance::Stepped);
    }

    #[test]
    fn hold_stops_the_effect() {
        let state = DeviceState::new(3, None, Ticks(0));
        let (state, _) = state.advance(AnimationKind::Idle, Ticks(0), 50);
        let state = state.hold(Color::ORANGE, Ticks(70));
        assert_eq!(state.cursor, AnimationCursor::new(Ticks(70)));
        assert!(state.status.pixels().iter().all(|&c| c == Color::ORANGE));
    }
}
