//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub key: String,
    pub url: String,
}

impl Target {
    pub fn new(key: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
        }
    }
}

/// Binary result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    #[serde(rename = "failed")]
    Failure,
}

impl Outcome {
    /// Value stored in the `result` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failed",
        }
    }

    /// Parse a stored value. Anything other than `success` is a failure.
    pub fn from_db(s: &str) -> Self {
        if s.trim() == "success" {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// A single persisted check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub key: String,
    /// UTC, truncated to the minute.
    #[serde(with = "minute_format")]
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
}

impl ProbeOutcome {
    pub fn new(key: &str, timestamp: DateTime<Utc>, outcome: Outcome) -> Self {
        Self {
            key: key.to_string(),
            timestamp,
            outcome,
        }
    }
}

/// Full outcome set across all targets.
///
/// `omitted` lists series whose query failed while the snapshot was
/// assembled; their records are absent from `records`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub records: Vec<ProbeOutcome>,
    pub omitted: Vec<String>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty()
    }

    /// Records belonging to a single target.
    pub fn history(&self, key: &str) -> Vec<ProbeOutcome> {
        self.records.iter().filter(|r| r.key == key).cloned().collect()
    }
}

/// Timestamp layout used on disk and on the wire: `YYYY-MM-DD HH:MM`.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

mod minute_format {
    use super::MINUTE_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(MINUTE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&s, MINUTE_FORMAT)
            .map(|dt| dt.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
