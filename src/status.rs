//! Printer status model and tolerant JSON extraction.
//!
//! The printer API is polled every few dozen milliseconds and its fields
//! come and go with the job lifecycle (no progress while idle, no bed
//! while the heater board is offline). Missing or wrongly typed fields
//! never fail a parse; they fall back to documented defaults.

use serde_json::Value;
use std::fmt;

/// Print job state, derived from the API's free-text `state.text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobState {
    Operational,
    Printing,
    Paused,
    Error,
    Completed,
    #[default]
    Unknown,
}

impl JobState {
    /// Parse the printer's state text.
    ///
    /// Case-insensitive. Unrecognized or empty text is `Unknown`.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim().to_lowercase();
        match text.as_str() {
            "operational" | "ready" | "standby" => Self::Operational,
            "printing" | "printing from sd" => Self::Printing,
            "paused" | "pausing" => Self::Paused,
            "completed" | "complete" | "finished" => Self::Completed,
            s if s.starts_with("error") || s.contains("error") => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Operational => "Operational",
            JobState::Printing => "Printing",
            JobState::Paused => "Paused",
            JobState::Error => "Error",
            JobState::Completed => "Completed",
            JobState::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Result of `GET /api/printer`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    /// Completion, 0-100.
    pub percentage: f64,
    /// Seconds since the job started.
    pub duration: f64,
}

impl JobStatus {
    pub fn from_json(body: &Value) -> Self {
        let state = body
            .pointer("/state/text")
            .and_then(Value::as_str)
            .map(JobState::from_text)
            .unwrap_or_default();

        let percentage = body
            .pointer("/result/progress/completion")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite())
            .map_or(0.0, |p| p.clamp(0.0, 100.0));

        let duration = body
            .pointer("/result/print_stats/print_duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite())
            .map_or(0.0, |d| d.max(0.0));

        Self {
            state,
            percentage,
            duration,
        }
    }
}

/// Result of `GET /printer/objects/query?heater_bed&extruder`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Temperatures {
    pub bed: Option<f64>,
    pub extruder: Option<f64>,
}

impl Temperatures {
    pub fn from_json(body: &Value) -> Self {
        let read = |pointer: &str| {
            body.pointer(pointer)
                .and_then(Value::as_f64)
                .filter(|t| t.is_finite())
        };
        Self {
            bed: read("/result/status/heater_bed/temperature"),
            extruder: read("/result/status/extruder/temperature"),
        }
    }
}

/// Telemetry recomputed on every successful poll.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Telemetry {
    pub bed_temp: Option<f64>,
    pub extruder_temp: Option<f64>,
    pub job_percentage: f64,
    pub print_duration: f64,
}

/// One successful poll: both endpoints answered.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PrinterSnapshot {
    pub state: JobState,
    pub telemetry: Telemetry,
}

impl PrinterSnapshot {
    pub fn new(job: JobStatus, temps: Temperatures) -> Self {
        Self {
            state: job.state,
            telemetry: Telemetry {
                bed_temp: temps.bed,
                extruder_temp: temps.extruder,
                job_percentage: job.percentage,
                print_duration: job.duration,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("Operational", JobState::Operational)]
    #[case("operational", JobState::Operational)]
    #[case("  Printing ", JobState::Printing)]
    #[case("Printing from SD", JobState::Printing)]
    #[case("Paused", JobState::Paused)]
    #[case("Pausing", JobState::Paused)]
    #[case("Error", JobState::Error)]
    #[case("Error: heater decoupled", JobState::Error)]
    #[case("Offline after error", JobState::Error)]
    #[case("Completed", JobState::Completed)]
    #[case("Finished", JobState::Completed)]
    #[case("", JobState::Unknown)]
    #[case("Cancelling", JobState::Unknown)]
    #[case("Connecting", JobState::Unknown)]
    fn job_state_from_text(#[case] text: &str, #[case] expected: JobState) {
        assert_eq!(JobState::from_text(text), expected);
    }

    #[test]
    fn job_state_display_round_trips_through_from_text() {
        for state in [
            JobState::Operational,
            JobState::Printing,
            JobState::Paused,
            JobState::Error,
            JobState::Completed,
            JobState::Unknown,
        ] {
            assert_eq!(JobState::from_text(&state.to_string()), state);
        }
    }

    #[test]
    fn job_status_reads_all_fields() {
        let body = json!({
            "state": { "text": "Printing" },
            "result": {
                "progress": { "completion": 42.5 },
                "print_stats": { "print_duration": 120.0 }
            }
        });
        assert_eq!(
            JobStatus::from_json(&body),
            JobStatus {
                state: JobState::Printing,
                percentage: 42.5,
                duration: 120.0,
            }
        );
    }

    #[test]
    fn job_status_defaults_missing_fields() {
        let status = JobStatus::from_json(&json!({ "state": { "text": "Operational" } }));
        assert_eq!(status.state, JobState::Operational);
        assert_eq!(status.percentage, 0.0);
        assert_eq!(status.duration, 0.0);

        assert_eq!(JobStatus::from_json(&json!({})), JobStatus::default());
        assert_eq!(JobStatus::from_json(&json!([1, 2, 3])), JobStatus::default());
    }

    #[test]
    fn job_status_ignores_wrong_types_and_clamps() {
        let body = json!({
            "state": { "text": 7 },
            "result": {
                "progress": { "completion": null },
                "print_stats": { "print_duration": -3 }
            }
        });
        assert_eq!(JobStatus::from_json(&body), JobStatus::default());

        let over = json!({ "result": { "progress": { "completion": 140 } } });
        assert_eq!(JobStatus::from_json(&over).percentage, 100.0);
    }

    #[test]
    fn temperatures_read_both_heaters() {
        let body = json!({
            "result": { "status": {
                "heater_bed": { "temperature": 60.2 },
                "extruder": { "temperature": 210 }
            }}
        });
        assert_eq!(
            Temperatures::from_json(&body),
            Temperatures {
                bed: Some(60.2),
                extruder: Some(210.0),
            }
        );
    }

    #[test]
    fn missing_temperatures_are_absent_not_zero() {
        let body = json!({ "result": { "status": { "extruder": { "temperature": "hot" } } } });
        assert_eq!(Temperatures::from_json(&body), Temperatures::default());
        assert_eq!(Temperatures::default().bed, None);
    }

    #[test]
    fn snapshot_combines_both_polls() {
        let snapshot = PrinterSnapshot::new(
            JobStatus {
                state: JobState::Paused,
                percentage: 10.0,
                duration: 5.0,
            },
            Temperatures {
                bed: Some(55.0),
                extruder: None,
            },
        );
        assert_eq!(snapshot.state, JobState::Paused);
        assert_eq!(snapshot.telemetry.bed_temp, Some(55.0));
        assert_eq!(snapshot.telemetry.extruder_temp, None);
        assert_eq!(snapshot.telemetry.job_percentage, 10.0);
        assert_eq!(snapshot.telemetry.print_duration, 5.0);
    }
}
