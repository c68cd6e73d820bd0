//! Scheduler module for running probe cycles.

use crate::config::{self, ConfigError};
use crate::db::ProbeOutcome;
use crate::notifier::Notifier;
use crate::probe::{probe, HttpCheck, RetryPolicy};

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Source of the timestamp stamped on each outcome.
pub type Clock = fn() -> DateTime<Utc>;

/// Fires a check cycle over every configured target at a fixed cadence.
pub struct Scheduler<C: HttpCheck> {
    notifier: Notifier,
    checker: Arc<C>,
    targets_path: PathBuf,
    interval: Duration,
    policy: RetryPolicy,
    clock: Clock,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<C: HttpCheck> Scheduler<C> {
    /// Create a new scheduler reading targets from `targets_path`.
    pub fn new(
        notifier: Notifier,
        checker: Arc<C>,
        targets_path: PathBuf,
        interval: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            notifier,
            checker,
            targets_path,
            interval,
            policy,
            clock: Utc::now,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Start the repeating timer. Missed ticks are skipped.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!(
            "Scheduler: Checking targets from {} every {:?}",
            self.targets_path.display(),
            self.interval
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match self.run_cycle() {
                    Ok(probes) => tracing::debug!("Scheduler: Dispatched {} probes", probes.len()),
                    Err(e) => tracing::error!("Scheduler: Skipping tick: {}", e),
                }
            }
        })
    }

    /// Run one cycle: load the target list and probe each target.
    ///
    /// A target whose previous probe is still running is skipped for this
    /// cycle. Returns the handles of the probes that were started.
    pub fn run_cycle(&self) -> Result<Vec<JoinHandle<()>>, ConfigError> {
        let targets = config::load_targets(&self.targets_path)?;
        let mut probes = Vec::with_capacity(targets.len());

        for target in targets {
            let Some(slot) = InFlightSlot::claim(&self.in_flight, &target.key) else {
                tracing::warn!("Scheduler: Skipping {}, previous probe still running", target.key);
                continue;
            };

            let checker = self.checker.clone();
            let notifier = self.notifier.clone();
            let policy = self.policy;
            let clock = self.clock;

            probes.push(tokio::spawn(async move {
                let _slot = slot; // Hold the slot until recorded

                let outcome = probe(&*checker, &target.url, policy).await;
                let record = ProbeOutcome::new(&target.key, truncate_to_minute(clock()), outcome);

                tracing::info!(
                    "Scheduler: {},{},{}",
                    record.key,
                    record.timestamp.format(crate::db::MINUTE_FORMAT),
                    record.outcome.as_str()
                );

                // The append and snapshot query hit the store synchronously.
                let key = record.key.clone();
                match tokio::task::spawn_blocking(move || notifier.record(&record)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Scheduler: Failed to record result for {}: {}", key, e),
                    Err(e) => tracing::error!("Scheduler: Record task for {} failed: {}", key, e),
                }
            }));
        }

        Ok(probes)
    }
}

/// Marks a target key as having a probe in flight until dropped.
struct InFlightSlot {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightSlot {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        let mut keys = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Truncate a datetime to the start of its minute.
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    let ts = dt.timestamp();
    let truncated = ts - ts.rem_euclid(60);
    DateTime::from_timestamp(truncated, 0).unwrap_or(dt)
}
