use crate::store::error::StoreError;
use crate::types::observation::{LocationId, Observation};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of merging a batch into a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys that were not present before.
    pub inserted: usize,
    /// Existing keys whose record changed.
    pub updated: usize,
    /// Existing keys whose record was identical.
    pub unchanged: usize,
}

impl MergeStats {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated > 0
    }
}

/// Persistent per-location observation history keyed by (location, timestamp).
pub trait HistoryStore: Send + Sync {
    /// The location's records in ascending timestamp order.
    fn series(&self, location: &LocationId) -> Result<Vec<Observation>, StoreError>;

    /// Inserts or replaces records. The last record of the batch wins for a repeated
    /// key, and merging the same batch twice leaves the store unchanged.
    fn merge(&self, batch: Vec<Observation>) -> Result<MergeStats, StoreError>;

    fn locations(&self) -> Result<BTreeSet<LocationId>, StoreError>;
}

type Series = BTreeMap<DateTime<Utc>, Observation>;

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    data: RwLock<BTreeMap<LocationId, Series>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, grouped by location and ordered by timestamp.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.data
            .read()
            .values()
            .flat_map(|series| series.values().cloned())
            .collect()
    }

    pub(crate) fn merge_records(&self, batch: Vec<Observation>) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut data = self.data.write();
        for observation in batch {
            let series = data.entry(observation.location.clone()).or_default();
            match series.insert(observation.timestamp, observation.clone()) {
                None => stats.inserted += 1,
                Some(previous) if previous == observation => stats.unchanged += 1,
                Some(_) => stats.updated += 1,
            }
        }
        stats
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn series(&self, location: &LocationId) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .data
            .read()
            .get(location)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default())
    }

    fn merge(&self, batch: Vec<Observation>) -> Result<MergeStats, StoreError> {
        Ok(self.merge_records(batch))
    }

    fn locations(&self) -> Result<BTreeSet<LocationId>, StoreError> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_observations;

    #[test]
    fn test_merge_is_idempotent() {
        let store = MemoryHistoryStore::new();
        let batch = synthetic_observations("Hanoi", 30);

        let first = store.merge(batch.clone()).unwrap();
        assert_eq!(first.inserted, 30);
        let before = store.snapshot();

        let second = store.merge(batch).unwrap();
        assert_eq!(second, MergeStats { inserted: 0, updated: 0, unchanged: 30 });
        assert!(!second.changed());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_last_write_wins_and_series_is_sorted() {
        let store = MemoryHistoryStore::new();
        let mut batch = synthetic_observations("Hanoi", 5);
        batch.reverse();
        let mut replacement = batch[0].clone();
        replacement.temperature = Some(-3.0);
        batch.push(replacement.clone());
        store.merge(batch).unwrap();

        let series = store.series(&LocationId::new("Hanoi")).unwrap();
        assert_eq!(series.len(), 5);
        assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(series.last().unwrap().temperature, Some(-3.0));

        let update = store.merge(vec![synthetic_observations("Hanoi", 5).remove(4)]).unwrap();
        assert_eq!(update.updated, 1);
    }

    #[test]
    fn test_locations_and_unknown_series() {
        let store = MemoryHistoryStore::new();
        store.merge(synthetic_observations("Hue", 3)).unwrap();
        store.merge(synthetic_observations("Hanoi", 3)).unwrap();

        let locations: Vec<_> = store.locations().unwrap().into_iter().collect();
        assert_eq!(locations, vec![LocationId::new("Hanoi"), LocationId::new("Hue")]);
        assert!(store.series(&LocationId::new("Vinh")).unwrap().is_empty());
        assert_eq!(store.len(), 6);
    }
}
