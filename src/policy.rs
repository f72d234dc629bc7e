//! Color policy: fixed mappings from printer telemetry to colors.
//!
//! Temperature buckets use inclusive upper bounds throughout: 30.0 is
//! still blue, 30.01 is orange.

use crate::Color;
use crate::strip::Frame;

/// Upper bound (inclusive) of the blue bucket, and the bed temperature at
/// which an operational printer switches from the idle rainbow to the
/// temperature display.
pub const WARM_BED_C: f64 = 30.0;
pub const HOT_BED_C: f64 = 60.0;
pub const VERY_HOT_BED_C: f64 = 90.0;

/// Color shown while a job is running and no bed temperature is known.
pub const JOB_ACTIVE: Color = Color::GREEN;
pub const PROGRESS_FILL: Color = Color::GREEN;

/// Map a temperature in °C to one of four fixed colors.
pub fn color_for_temperature(t: f64) -> Color {
    if t <= WARM_BED_C {
        Color::BLUE
    } else if t <= HOT_BED_C {
        Color::ORANGE
    } else if t <= VERY_HOT_BED_C {
        Color::RED
    } else {
        Color::WHITE
    }
}

/// Solid color for the status strip while printing.
pub fn printing_accent(bed_temp: Option<f64>) -> Color {
    bed_temp.map_or(JOB_ACTIVE, color_for_temperature)
}

/// Number of LEDs a progress bar of `percentage` lights on a strip of `len`.
pub fn progress_lit(percentage: f64, len: usize) -> usize {
    let fraction = if percentage.is_finite() {
        percentage.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    };
    ((fraction * len as f64).round() as usize).min(len)
}

/// Fill `frame` as a left-to-right progress bar.
pub fn render_progress(percentage: f64, frame: &mut Frame) {
    let lit = progress_lit(percentage, frame.len());
    for (i, pixel) in frame.pixels_mut().iter_mut().enumerate() {
        *pixel = if i < lit { PROGRESS_FILL } else { Color::OFF };
    }
}
