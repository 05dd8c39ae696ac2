//! A running log of held-out model quality, one record per location per day.

use crate::training::error::TrainingError;
use crate::training::trainer::ModelPair;
use crate::types::observation::LocationId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub date: NaiveDate,
    pub location: LocationId,
    pub data_points: usize,
    pub mae: Option<f64>,
    pub accuracy: Option<f64>,
}

impl EvaluationRecord {
    pub fn from_pair(date: NaiveDate, pair: &ModelPair) -> Self {
        Self {
            date,
            location: pair.location.clone(),
            data_points: pair.metrics.observations.unwrap_or(pair.metrics.samples),
            mae: pair.metrics.mae,
            accuracy: pair.metrics.accuracy,
        }
    }
}

/// Records keyed by (date, location). Adding a record for an existing key replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationLog {
    records: BTreeMap<(NaiveDate, LocationId), EvaluationRecord>,
}

impl EvaluationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EvaluationRecord) {
        self.records
            .insert((record.date, record.location.clone()), record);
    }

    /// Merges `other` into `self`; on conflicting keys `other` wins.
    pub fn merge(&mut self, other: EvaluationLog) {
        self.records.extend(other.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by date, then location.
    pub fn records(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.records.values()
    }

    /// Records of one location in date order.
    pub fn history<'a>(&'a self, location: &'a LocationId) -> impl Iterator<Item = &'a EvaluationRecord> + 'a {
        self.records
            .values()
            .filter(move |record| &record.location == location)
    }

    /// Loads a log written by [`EvaluationLog::save`]. A missing file is an empty log.
    pub async fn load(path: &Path) -> Result<Self, TrainingError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(TrainingError::EvaluationLogRead(path.to_path_buf(), e)),
        };
        let records: Vec<EvaluationRecord> = serde_json::from_slice(&bytes)?;
        let mut log = Self::default();
        for record in records {
            log.push(record);
        }
        Ok(log)
    }

    pub async fn save(&self, path: &Path) -> Result<(), TrainingError> {
        let records: Vec<&EvaluationRecord> = self.records().collect();
        let json = serde_json::to_vec_pretty(&records)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| TrainingError::EvaluationLogWrite(path.to_path_buf(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(day: u32, location: &str, mae: f64) -> EvaluationRecord {
        EvaluationRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            location: LocationId::new(location),
            data_points: 120,
            mae: Some(mae),
            accuracy: Some(0.7),
        }
    }

    #[test]
    fn test_merge_keeps_last_per_key() {
        let mut log = EvaluationLog::new();
        log.push(record(1, "Hanoi", 1.0));
        log.push(record(1, "Da Nang", 1.5));

        let mut update = EvaluationLog::new();
        update.push(record(1, "Hanoi", 0.8));
        update.push(record(2, "Hanoi", 0.9));
        log.merge(update);

        assert_eq!(log.len(), 3);
        let hanoi_id = LocationId::new("Hanoi");
        let hanoi: Vec<_> = log.history(&hanoi_id).collect();
        assert_eq!(hanoi.len(), 2);
        assert_eq!(hanoi[0].mae, Some(0.8));
        assert_eq!(hanoi[1].mae, Some(0.9));
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<(), TrainingError> {
        let dir = tempdir().map_err(|e| TrainingError::EvaluationLogWrite("tempdir".into(), e))?;
        let path = dir.path().join("evaluation_log.json");

        assert!(EvaluationLog::load(&path).await?.is_empty());

        let mut log = EvaluationLog::new();
        log.push(record(3, "Hue", 1.2));
        log.push(record(3, "Hanoi", 0.7));
        log.save(&path).await?;

        let loaded = EvaluationLog::load(&path).await?;
        assert_eq!(loaded, log);
        Ok(())
    }
}
