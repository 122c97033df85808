//! Training History Ledger
//!
//! Append-only record of completed training runs in a sled database.
//! Key format: `{trained_at_nanos:be64}{training_id}` so iteration order is
//! chronological and runs in the same nanosecond still get distinct keys.
//! A separate `latest_by_model` tree maps each model name to the key of its
//! newest run, so the latest lookup does not scan the ledger.

use std::path::Path;

use sled::{Db, Tree};
use tracing::debug;

use crate::types::TrainReport;

use super::StorageError;

const LATEST_TREE: &str = "latest_by_model";

pub struct TrainingHistory {
    db: Db,
    latest: Tree,
}

impl TrainingHistory {
    /// Open or create the ledger database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_db(sled::open(path)?)
    }

    /// Open an in-memory database (for testing and offline CLI runs)
    pub fn open_temp() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let latest = db.open_tree(LATEST_TREE)?;
        Ok(Self { db, latest })
    }

    fn build_key(report: &TrainReport) -> Vec<u8> {
        let nanos = report
            .trained_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| report.trained_at.timestamp() * 1_000_000_000);
        let mut key = (nanos.max(0) as u64).to_be_bytes().to_vec();
        key.extend_from_slice(report.training_id.as_bytes());
        key
    }

    pub fn record(&self, report: &TrainReport) -> Result<(), StorageError> {
        let key = Self::build_key(report);
        let value = serde_json::to_vec(report)?;
        self.db.insert(key.as_slice(), value)?;

        // Only move the index forward; an older run recorded late keeps it
        let name = report.model_name.as_bytes();
        let newer = match self.latest.get(name)? {
            Some(current) => key.as_slice() > &*current,
            None => true,
        };
        if newer {
            self.latest.insert(name, key)?;
        }
        self.db.flush()?;

        debug!(
            model = %report.model_name,
            training_id = %report.training_id,
            "Recorded training run"
        );
        Ok(())
    }

    /// Most recent runs first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<TrainReport>, StorageError> {
        let mut reports = Vec::with_capacity(limit.min(self.db.len()));
        for entry in self.db.iter().rev().take(limit) {
            let (_, value) = entry?;
            reports.push(serde_json::from_slice(&value)?);
        }
        Ok(reports)
    }

    /// Most recent run for one model name.
    pub fn latest_for(&self, model_name: &str) -> Result<Option<TrainReport>, StorageError> {
        let Some(key) = self.latest.get(model_name.as_bytes())? else {
            return Ok(None);
        };
        match self.db.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn report(model: &str, id: &str, minute: i64) -> TrainReport {
        TrainReport {
            model_name: model.to_string(),
            training_id: id.to_string(),
            trained_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
            score: 0.9,
            train_samples: 80,
            test_samples: 20,
            tree_count: 100,
            data_seed: 42,
        }
    }

    #[test]
    fn test_recent_newest_first() {
        let history = TrainingHistory::open_temp().unwrap();
        history.record(&report("a", "1", 2)).unwrap();
        history.record(&report("a", "2", 0)).unwrap();
        history.record(&report("b", "3", 5)).unwrap();

        let ids: Vec<String> = history
            .recent(10)
            .unwrap()
            .into_iter()
            .map(|r| r.training_id)
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert_eq!(history.recent(1).unwrap().len(), 1);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_latest_for_model() {
        let history = TrainingHistory::open_temp().unwrap();
        assert!(history.latest_for("a").unwrap().is_none());
        history.record(&report("a", "1", 0)).unwrap();
        history.record(&report("a", "2", 1)).unwrap();
        history.record(&report("b", "3", 2)).unwrap();
        assert_eq!(history.latest_for("a").unwrap().unwrap().training_id, "2");
    }

    #[test]
    fn test_latest_for_ignores_older_run_recorded_late() {
        let history = TrainingHistory::open_temp().unwrap();
        history.record(&report("a", "new", 10)).unwrap();
        history.record(&report("a", "old", 1)).unwrap();
        assert_eq!(history.latest_for("a").unwrap().unwrap().training_id, "new");
        // The index lives in its own tree and does not count as a run
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_latest_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let history = TrainingHistory::open(&path).unwrap();
            history.record(&report("a", "1", 0)).unwrap();
            history.record(&report("b", "2", 1)).unwrap();
        }
        let history = TrainingHistory::open(&path).unwrap();
        assert_eq!(history.latest_for("a").unwrap().unwrap().training_id, "1");
        assert_eq!(history.latest_for("b").unwrap().unwrap().training_id, "2");
        assert!(history.latest_for("c").unwrap().is_none());
    }

    #[test]
    fn test_same_instant_keeps_both() {
        let history = TrainingHistory::open_temp().unwrap();
        history.record(&report("a", "x", 0)).unwrap();
        history.record(&report("a", "y", 0)).unwrap();
        assert_eq!(history.len(), 2);
    }
}
