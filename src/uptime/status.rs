//! Status classification for a daily uptime average.

use serde::Serialize;

/// Categorical status of one day (or of a target, via its latest day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    NoData,
    Success,
    Partial,
    Failure,
}

/// Averages below this are a major outage.
const FAILURE_THRESHOLD: f64 = 0.3;

impl Status {
    /// Classify a daily average. `None` means no outcomes that day.
    pub fn classify(average: Option<f64>) -> Self {
        match average {
            None => Status::NoData,
            Some(avg) if avg == 1.0 => Status::Success,
            Some(avg) if avg < FAILURE_THRESHOLD => Status::Failure,
            Some(_) => Status::Partial,
        }
    }

    /// Display priority; lower is more urgent.
    pub fn priority(&self) -> u8 {
        match self {
            Status::Failure => 1,
            Status::Partial => 2,
            Status::Success | Status::NoData => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NoData => "nodata",
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failure => "failure",
        }
    }

    /// Short headline for a target.
    pub fn label(&self) -> &'static str {
        match self {
            Status::NoData => "No Data Available",
            Status::Success => "Operational",
            Status::Partial => "Partial Outage",
            Status::Failure => "Major Outage",
        }
    }

    /// Longer text describing one day.
    pub fn description(&self) -> &'static str {
        match self {
            Status::NoData => "No Data Available: Health check was not performed.",
            Status::Success => "No downtime recorded on this day.",
            Status::Partial => "Partial outages recorded on this day.",
            Status::Failure => "Major outages recorded on this day.",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
