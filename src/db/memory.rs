//! In-memory result store for tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::models::ProbeOutcome;
use super::store::{DbError, ResultStore};

/// In-memory store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    series: Mutex<BTreeMap<String, Vec<ProbeOutcome>>>,
    fail_appends: AtomicBool,
    broken_series: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make `query` fail for one series.
    pub fn break_series(&self, key: &str) {
        self.broken_series
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string());
    }

    pub fn len(&self) -> usize {
        self.series
            .lock()
            .expect("lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

fn poisoned<T>(_: T) -> DbError {
    DbError::Unavailable("lock poisoned".into())
}

impl ResultStore for MemoryStore {
    fn append(&self, outcome: &ProbeOutcome) -> Result<(), DbError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("append disabled".into()));
        }
        self.series
            .lock()
            .map_err(poisoned)?
            .entry(outcome.key.clone())
            .or_default()
            .push(outcome.clone());
        Ok(())
    }

    fn query(&self, key: &str) -> Result<Vec<ProbeOutcome>, DbError> {
        if self.broken_series.lock().map_err(poisoned)?.contains(key) {
            return Err(DbError::Unavailable(format!("series {} unreadable", key)));
        }
        let mut history = self
            .series
            .lock()
            .map_err(poisoned)?
            .get(key)
            .cloned()
            .unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    fn series_keys(&self) -> Result<Vec<String>, DbError> {
        Ok(self
            .series
            .lock()
            .map_err(poisoned)?
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Outcome;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_query_all_omits_broken_series() {
        let store = MemoryStore::new();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.append(&ProbeOutcome::new("good", ts, Outcome::Success)).unwrap();
        store.append(&ProbeOutcome::new("bad", ts, Outcome::Failure)).unwrap();
        store.break_series("bad");

        let snapshot = store.query_all().unwrap();
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.omitted, vec!["bad".to_string()]);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].key, "good");
    }

    #[test]
    fn test_failed_append_is_not_stored() {
        let store = MemoryStore::new();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.fail_appends(true);
        assert!(store.append(&ProbeOutcome::new("x", ts, Outcome::Success)).is_err());
        assert_eq!(store.len(), 0);
        assert!(store.series_keys().unwrap().is_empty());
    }
}
