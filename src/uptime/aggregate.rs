//! Rolling-window aggregation of raw outcome history.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;

use super::Status;
use crate::db::ProbeOutcome;

/// Number of days in the rolling window.
pub const WINDOW_DAYS: usize = 7;

/// Uptime text when no outcomes were considered.
pub const NO_DATA_UPTIME: &str = "--%";

/// Average for one calendar day, relative to aggregation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyBucket {
    /// 0 is today, 6 is six days ago.
    pub day: u8,
    /// Mean of success (1) / failure (0); `None` when the day has no data.
    pub average: Option<f64>,
}

impl DailyBucket {
    pub fn status(&self) -> Status {
        Status::classify(self.average)
    }
}

/// Rolling seven-day picture of one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UptimeSummary {
    pub uptime: String,
    pub buckets: [DailyBucket; WINDOW_DAYS],
}

impl UptimeSummary {
    /// Status of the target, taken from today's bucket.
    pub fn status(&self) -> Status {
        self.buckets[0].status()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    successes: u32,
    total: u32,
}

impl Tally {
    fn add(&mut self, success: bool) {
        self.successes += u32::from(success);
        self.total += 1;
    }

    fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.successes) / f64::from(self.total))
    }
}

/// Aggregate a target's history into a seven-day summary.
///
/// Outcomes are grouped by calendar date in the time zone of `now`. The
/// history is scanned newest first and the scan stops once more than
/// [`WINDOW_DAYS`] distinct dates have been seen; the overall uptime covers
/// exactly the outcomes scanned. Input order does not matter.
pub fn aggregate<Tz: TimeZone>(history: &[ProbeOutcome], now: &DateTime<Tz>) -> UptimeSummary {
    let tz = now.timezone();

    let mut newest_first: Vec<&ProbeOutcome> = history.iter().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut days: HashMap<NaiveDate, Tally> = HashMap::new();
    let mut overall = Tally::default();

    for outcome in newest_first {
        let date = outcome.timestamp.with_timezone(&tz).date_naive();
        if !days.contains_key(&date) && days.len() >= WINDOW_DAYS {
            break;
        }

        let success = outcome.outcome.is_success();
        days.entry(date).or_default().add(success);
        overall.add(success);
    }

    let today = now.date_naive();
    let buckets = std::array::from_fn(|i| DailyBucket {
        day: i as u8,
        average: today
            .checked_sub_days(Days::new(i as u64))
            .and_then(|date| days.get(&date))
            .and_then(Tally::ratio),
    });

    let uptime = match overall.ratio() {
        Some(ratio) => format!("{:.2}%", ratio * 100.0),
        None => NO_DATA_UPTIME.to_string(),
    };

    UptimeSummary { uptime, buckets }
}
