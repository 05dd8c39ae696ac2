//! A [`MemoryHistoryStore`] persisted to a single parquet file.
//!
//! Column names only exist at this boundary; in memory, records are
//! [`Observation`] structs.

use crate::store::error::StoreError;
use crate::store::history_store::{HistoryStore, MemoryHistoryStore, MergeStats};
use crate::types::observation::{LocationId, Observation};
use chrono::DateTime;
use log::{debug, info};
use parking_lot::Mutex;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const LOCATION: &str = "location";
const TIMESTAMP: &str = "timestamp";
const TEMPERATURE: &str = "temperature";
const RELATIVE_HUMIDITY: &str = "relative_humidity";
const PRESSURE: &str = "pressure";
const WIND_SPEED: &str = "wind_speed";
const CLOUD_FRACTION: &str = "cloud_fraction";
const PRECIPITATION: &str = "precipitation_last_hour";
const CONDITION_CODE: &str = "condition_code";

pub struct ParquetHistoryStore {
    path: PathBuf,
    memory: MemoryHistoryStore,
    write_lock: Mutex<()>,
    /// Set while in-memory records have not reached the file, e.g. after a failed flush.
    unflushed: AtomicBool,
}

impl ParquetHistoryStore {
    /// Opens the store at `path`, loading existing records when the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let memory = MemoryHistoryStore::new();
        if path.exists() {
            let records = read_parquet(&path)?;
            info!("Loaded {} history records from {}", records.len(), path.display());
            memory.merge_records(records);
        } else {
            debug!("No history file at {}, starting empty", path.display());
        }
        Ok(Self {
            path,
            memory,
            write_lock: Mutex::new(()),
            unflushed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every record to the parquet file, replacing its contents.
    pub fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let records = self.memory.snapshot();
        let mut df = to_dataframe(&records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteIo(self.path.clone(), e))?;
        }
        let file = std::fs::File::create(&self.path).map_err(|e| StoreError::WriteIo(self.path.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| StoreError::WritePolars(self.path.clone(), e))?;
        self.unflushed.store(false, Ordering::Release);
        debug!("Wrote {} history records to {}", records.len(), self.path.display());
        Ok(())
    }
}

impl HistoryStore for ParquetHistoryStore {
    fn series(&self, location: &LocationId) -> Result<Vec<Observation>, StoreError> {
        self.memory.series(location)
    }

    /// Merges into memory, then writes the file when anything changed or an earlier
    /// write failed. On error the records stay in memory and the next merge retries.
    fn merge(&self, batch: Vec<Observation>) -> Result<MergeStats, StoreError> {
        let stats = self.memory.merge_records(batch);
        if stats.changed() {
            self.unflushed.store(true, Ordering::Release);
        }
        if self.unflushed.load(Ordering::Acquire) {
            self.flush()?;
        }
        Ok(stats)
    }

    fn locations(&self) -> Result<BTreeSet<LocationId>, StoreError> {
        self.memory.locations()
    }
}

fn to_dataframe(records: &[Observation]) -> Result<DataFrame, StoreError> {
    let column = |f: fn(&Observation) -> Option<f64>| records.iter().map(f).collect::<Vec<_>>();
    let df = df!(
        LOCATION => records.iter().map(|r| r.location.to_string()).collect::<Vec<_>>(),
        TIMESTAMP => records.iter().map(|r| r.timestamp.timestamp_millis()).collect::<Vec<_>>(),
        TEMPERATURE => column(|r| r.temperature),
        RELATIVE_HUMIDITY => column(|r| r.relative_humidity),
        PRESSURE => column(|r| r.pressure),
        WIND_SPEED => column(|r| r.wind_speed),
        CLOUD_FRACTION => column(|r| r.cloud_fraction),
        PRECIPITATION => column(|r| r.precipitation_last_hour),
        CONDITION_CODE => records.iter().map(|r| r.condition_code.clone()).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

fn read_parquet(path: &Path) -> Result<Vec<Observation>, StoreError> {
    let file = std::fs::File::open(path).map_err(|e| StoreError::ReadIo(path.to_path_buf(), e))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::ReadPolars(path.to_path_buf(), e))?;

    let location = df.column(LOCATION)?.str()?;
    let timestamp = df.column(TIMESTAMP)?.i64()?;
    let temperature = df.column(TEMPERATURE)?.f64()?;
    let relative_humidity = df.column(RELATIVE_HUMIDITY)?.f64()?;
    let pressure = df.column(PRESSURE)?.f64()?;
    let wind_speed = df.column(WIND_SPEED)?.f64()?;
    let cloud_fraction = df.column(CLOUD_FRACTION)?.f64()?;
    let precipitation = df.column(PRECIPITATION)?.f64()?;
    let condition_code = df.column(CONDITION_CODE)?.str()?;

    (0..df.height())
        .map(|row| {
            let location = location
                .get(row)
                .ok_or(StoreError::MissingValue { row, column: LOCATION })?;
            let millis = timestamp
                .get(row)
                .ok_or(StoreError::MissingValue { row, column: TIMESTAMP })?;
            let timestamp = DateTime::from_timestamp_millis(millis)
                .ok_or(StoreError::InvalidTimestamp { row, millis })?;

            Ok(Observation {
                location: LocationId::new(location),
                timestamp,
                temperature: temperature.get(row),
                relative_humidity: relative_humidity.get(row),
                pressure: pressure.get(row),
                wind_speed: wind_speed.get(row),
                cloud_fraction: cloud_fraction.get(row),
                precipitation_last_hour: precipitation.get(row),
                condition_code: condition_code.get(row).map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_observations;
    use tempfile::tempdir;

    #[test]
    fn test_records_survive_reopen() -> Result<(), StoreError> {
        let dir = tempdir().map_err(|e| StoreError::WriteIo("tempdir".into(), e))?;
        let path = dir.path().join("history").join("observations.parquet");

        let store = ParquetHistoryStore::open(&path)?;
        let mut batch = synthetic_observations("Hanoi", 12);
        batch[3].pressure = None;
        batch[4].condition_code = None;
        batch.extend(synthetic_observations("Da Nang", 4));
        let stats = store.merge(batch.clone())?;
        assert_eq!(stats.inserted, 16);
        assert!(path.exists());

        let reopened = ParquetHistoryStore::open(&path)?;
        assert_eq!(reopened.locations()?, store.locations()?);
        let hanoi = reopened.series(&LocationId::new("Hanoi"))?;
        assert_eq!(hanoi, batch[..12].to_vec());
        assert_eq!(hanoi[3].pressure, None);
        assert_eq!(hanoi[4].condition_code, None);
        Ok(())
    }

    #[test]
    fn test_unchanged_merge_does_not_rewrite() -> Result<(), StoreError> {
        let dir = tempdir().map_err(|e| StoreError::WriteIo("tempdir".into(), e))?;
        let path = dir.path().join("observations.parquet");
        let store = ParquetHistoryStore::open(&path)?;
        store.merge(synthetic_observations("Hue", 3))?;
        std::fs::remove_file(&path).map_err(|e| StoreError::WriteIo(path.clone(), e))?;

        let stats = store.merge(synthetic_observations("Hue", 3))?;
        assert!(!stats.changed());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_failed_write_is_retried_by_next_merge() -> Result<(), StoreError> {
        let dir = tempdir().map_err(|e| StoreError::WriteIo("tempdir".into(), e))?;
        let path = dir.path().join("observations.parquet");
        let store = ParquetHistoryStore::open(&path)?;
        let batch = synthetic_observations("Hanoi", 5);

        // A directory in the file's place makes the write fail.
        std::fs::create_dir(&path).map_err(|e| StoreError::WriteIo(path.clone(), e))?;
        assert!(matches!(store.merge(batch.clone()), Err(StoreError::WriteIo(_, _))));
        std::fs::remove_dir(&path).map_err(|e| StoreError::WriteIo(path.clone(), e))?;

        let stats = store.merge(batch.clone())?;
        assert!(!stats.changed());
        assert_eq!(stats.unchanged, 5);
        assert!(path.is_file());

        let reopened = ParquetHistoryStore::open(&path)?;
        assert_eq!(reopened.series(&LocationId::new("Hanoi"))?, batch);

        // Once written, an unchanged merge leaves the file alone again.
        std::fs::remove_file(&path).map_err(|e| StoreError::WriteIo(path.clone(), e))?;
        store.merge(batch)?;
        assert!(!path.exists());
        Ok(())
    }
}
