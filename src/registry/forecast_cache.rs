use crate::types::forecast::ForecastHour;
use crate::types::observation::LocationId;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifies a computed forecast. `trained_at` ties the entry to the model that
/// produced it, so a retrained location never hits an older model's forecast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    pub location: LocationId,
    pub trained_at: DateTime<Utc>,
    pub horizon_hours: usize,
    pub start: DateTime<Utc>,
}

#[derive(Debug)]
struct CachedForecast {
    hours: Arc<Vec<ForecastHour>>,
    inserted_at: Instant,
}

/// Time-limited cache of computed forecast hours.
#[derive(Debug)]
pub struct ForecastCache {
    ttl: Duration,
    entries: RwLock<HashMap<ForecastKey, CachedForecast>>,
}

impl ForecastCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &ForecastKey) -> Option<Arc<Vec<ForecastHour>>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &ForecastKey, now: Instant) -> Option<Arc<Vec<ForecastHour>>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) >= self.ttl {
            debug!("Cached forecast for '{}' expired", key.location);
            return None;
        }
        Some(Arc::clone(&entry.hours))
    }

    pub fn insert(&self, key: ForecastKey, hours: Arc<Vec<ForecastHour>>) {
        self.insert_at(key, hours, Instant::now());
    }

    fn insert_at(&self, key: ForecastKey, hours: Arc<Vec<ForecastHour>>, now: Instant) {
        let mut entries = self.entries.write();
        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        entries.insert(key, CachedForecast { hours, inserted_at: now });
    }

    /// Drops every cached forecast of `location`. Returns how many were removed.
    pub fn invalidate(&self, location: &LocationId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| &key.location != location);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
