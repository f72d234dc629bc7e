//! Per-cycle console report.

use crate::status::PrinterSnapshot;
use std::fmt;

/// Human-readable summary of the latest known printer state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    pub snapshot: PrinterSnapshot,
    /// The poll for this cycle failed; `snapshot` is from an earlier one.
    pub stale: bool,
}

struct Temp(Option<f64>);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{t:.1}°C"),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.snapshot.telemetry;
        if self.stale {
            writeln!(f, "REPORT (stale):")?;
        } else {
            writeln!(f, "REPORT:")?;
        }
        writeln!(f, "Bed Temperature: {}", Temp(t.bed_temp))?;
        writeln!(f, "Extruder Temperature: {}", Temp(t.extruder_temp))?;
        writeln!(
            f,
            "The current state of the print job is: {}",
            self.snapshot.state
        )?;
        writeln!(f, "Progress: {:.0}%", t.job_percentage)?;
        write!(f, "Print Duration: {:.0} seconds", t.print_duration)
    }
}
