//! The main entry point: ties the history store, the observation source, per-location
//! training and the forecaster together behind one handle.

use crate::config::EngineConfig;
use crate::error::MeteocastError;
use crate::features::preprocess::prepare_series;
use crate::fetch::met_no::MetNoSource;
use crate::fetch::source::ObservationSource;
use crate::forecasting::error::ForecastError;
use crate::forecasting::forecaster::Forecaster;
use crate::registry::forecast_cache::{ForecastCache, ForecastKey};
use crate::registry::model_registry::ModelRegistry;
use crate::store::history_store::{HistoryStore, MergeStats};
use crate::store::parquet_store::ParquetHistoryStore;
use crate::training::error::TrainingError;
use crate::training::evaluation::{EvaluationLog, EvaluationRecord};
use crate::training::trainer::{ModelPair, Trainer};
use crate::types::forecast::{ForecastHour, LocationForecast};
use crate::types::location::LatLon;
use crate::types::observation::{LocationId, Observation};
use crate::types::required_fields::RequiredField;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use futures_util::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HISTORY_FILE_NAME: &str = "observations.parquet";
const MODEL_DIR_NAME: &str = "models";
const EVALUATION_LOG_FILE_NAME: &str = "evaluation_log.json";

/// Selects the model a forecast is made with.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// A trained location by name.
    Id(LocationId),
    /// Any point; the nearest trained location answers.
    Coordinates(LatLon),
}

impl From<LocationId> for LocationQuery {
    fn from(value: LocationId) -> Self {
        LocationQuery::Id(value)
    }
}

impl From<&str> for LocationQuery {
    fn from(value: &str) -> Self {
        LocationQuery::Id(LocationId::new(value))
    }
}

impl From<LatLon> for LocationQuery {
    fn from(value: LatLon) -> Self {
        LocationQuery::Coordinates(value)
    }
}

/// Result of [`Meteocast::train_all`]. One location failing never stops the others.
#[derive(Debug, Default)]
pub struct TrainingSummary {
    pub trained: Vec<LocationId>,
    pub failed: Vec<(LocationId, MeteocastError)>,
}

impl TrainingSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// How [`Meteocast::refresh_location`] obtained data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data was fetched and merged into the history store.
    Fetched(MergeStats),
    /// The source failed or is not configured; `records` stored observations remain
    /// available for training and seeding.
    FromHistory { records: usize },
}

/// A forecasting engine over a set of known locations.
///
/// # Examples
///
/// ```no_run
/// # use meteocast::{EngineConfig, Meteocast, MeteocastError, LatLon};
/// # #[tokio::main]
/// # async fn main() -> Result<(), MeteocastError> {
/// let engine = Meteocast::open(EngineConfig::default()).await?;
/// for location in engine.locations() {
///     engine.refresh_location(&location).await?;
/// }
/// let summary = engine.train_all().await;
/// println!("trained {} locations", summary.trained.len());
///
/// let forecast = engine
///     .forecast()
///     .location(LatLon(16.4637, 107.5909)) // Hue, answered by the nearest model
///     .horizon_hours(12)
///     .call()
///     .await?;
/// for hour in &forecast.hours {
///     println!("{} {:.1}°C {}", hour.timestamp, hour.temperature, hour.condition);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Meteocast {
    config: EngineConfig,
    trainer: Trainer,
    forecaster: Forecaster,
    offset: FixedOffset,
    catalog: BTreeMap<LocationId, LatLon>,
    store: Arc<dyn HistoryStore>,
    source: Option<Arc<dyn ObservationSource>>,
    registry: ModelRegistry,
    cache: ForecastCache,
    evaluation: Mutex<EvaluationLog>,
}

#[bon]
impl Meteocast {
    /// Creates an engine over an explicit store and, optionally, an upstream source.
    ///
    /// Nothing is loaded; the registry starts empty.
    ///
    /// # Errors
    ///
    /// Returns [`MeteocastError::InvalidConfig`] when `config` fails validation.
    #[builder]
    pub fn new(
        #[builder(default)] config: EngineConfig,
        store: Arc<dyn HistoryStore>,
        source: Option<Arc<dyn ObservationSource>>,
    ) -> Result<Self, MeteocastError> {
        config.validate()?;
        let offset = config
            .utc_offset()
            .ok_or_else(|| MeteocastError::InvalidConfig("utc offset out of range".into()))?;
        let catalog = config
            .locations
            .iter()
            .map(|location| (location.id.clone(), location.coordinates))
            .collect();
        Ok(Self {
            trainer: config.trainer(),
            forecaster: config.forecaster(),
            cache: ForecastCache::new(config.forecast_cache_ttl()),
            offset,
            catalog,
            store,
            source,
            registry: ModelRegistry::new(),
            evaluation: Mutex::new(EvaluationLog::new()),
            config,
        })
    }

    /// Opens the engine on its data directory: parquet history, saved models and the
    /// evaluation log are loaded when present, and MET Norway is the upstream source.
    ///
    /// The data directory is `config.data_dir`, or `meteocast` under the user's cache
    /// directory. It is created if missing.
    pub async fn open(config: EngineConfig) -> Result<Self, MeteocastError> {
        config.validate()?;
        let data_dir = resolve_data_dir(&config)?;
        ensure_cache_dir_exists(&data_dir).await?;

        let history_path = data_dir.join(HISTORY_FILE_NAME);
        let store = tokio::task::spawn_blocking(move || ParquetHistoryStore::open(history_path)).await??;
        let source = MetNoSource::builder().build()?;

        let engine = Self::builder()
            .config(config)
            .store(Arc::new(store))
            .source(Arc::new(source))
            .build()?;
        let loaded = engine.registry.load_dir(&data_dir.join(MODEL_DIR_NAME)).await?;
        let log = EvaluationLog::load(&data_dir.join(EVALUATION_LOG_FILE_NAME)).await?;
        *engine.evaluation.lock() = log;
        info!("Opened engine at {} with {} trained locations", data_dir.display(), loaded);
        Ok(engine)
    }

    /// Writes the trained models and the evaluation log to the data directory.
    pub async fn persist(&self) -> Result<(), MeteocastError> {
        let data_dir = resolve_data_dir(&self.config)?;
        ensure_cache_dir_exists(&data_dir).await?;
        self.registry.save_dir(&data_dir.join(MODEL_DIR_NAME)).await?;
        let log = self.evaluation.lock().clone();
        log.save(&data_dir.join(EVALUATION_LOG_FILE_NAME)).await?;
        Ok(())
    }

    /// Loads models saved by [`Meteocast::persist`] from another directory.
    pub async fn load_models(&self, dir: &Path) -> Result<usize, MeteocastError> {
        let loaded = self.registry.load_dir(dir).await?;
        self.cache.clear();
        Ok(loaded)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Every location in the catalog, trained or not.
    pub fn locations(&self) -> BTreeSet<LocationId> {
        self.catalog.keys().cloned().collect()
    }

    /// Locations that currently have a trained model.
    pub fn available_locations(&self) -> BTreeSet<LocationId> {
        self.registry.locations()
    }

    pub fn evaluation_log(&self) -> EvaluationLog {
        self.evaluation.lock().clone()
    }

    fn coordinates_of(&self, location: &LocationId) -> Result<LatLon, MeteocastError> {
        self.catalog
            .get(location)
            .copied()
            .ok_or_else(|| MeteocastError::UnknownLocation(location.clone()))
    }

    /// Fetches fresh observations for `location` and merges them into the history.
    ///
    /// A failing (or absent) source is not an error as long as the history already
    /// holds data for the location; the fetch error is only returned when there is
    /// nothing to fall back to.
    pub async fn refresh_location(&self, location: &LocationId) -> Result<RefreshOutcome, MeteocastError> {
        let coordinates = self.coordinates_of(location)?;

        let fetch_error = match &self.source {
            Some(source) => match source.fetch(location, coordinates).await {
                Ok(observations) => {
                    let stats = self.merge_into_store(observations).await?;
                    info!(
                        "'{}': {} new, {} updated observations",
                        location, stats.inserted, stats.updated
                    );
                    if stats.changed() {
                        self.cache.invalidate(location);
                    }
                    return Ok(RefreshOutcome::Fetched(stats));
                }
                Err(e) => Some(e),
            },
            None => None,
        };

        let records = self.store.series(location)?.len();
        match fetch_error {
            Some(e) if records == 0 => Err(e.into()),
            Some(e) => {
                warn!("Fetch for '{}' failed, using {} stored observations: {}", location, records, e);
                Ok(RefreshOutcome::FromHistory { records })
            }
            None => {
                debug!("No source configured, '{}' has {} stored observations", location, records);
                Ok(RefreshOutcome::FromHistory { records })
            }
        }
    }

    /// Refreshes every catalog location concurrently.
    pub async fn refresh_all(&self) -> BTreeMap<LocationId, Result<RefreshOutcome, MeteocastError>> {
        let locations = self.locations();
        let outcomes = join_all(locations.iter().map(|location| self.refresh_location(location))).await;
        locations.into_iter().zip(outcomes).collect()
    }

    async fn merge_into_store(&self, observations: Vec<Observation>) -> Result<MergeStats, MeteocastError> {
        let store = Arc::clone(&self.store);
        let stats = tokio::task::spawn_blocking(move || store.merge(observations)).await??;
        Ok(stats)
    }

    /// Trains one location from its stored history and swaps the new pair in.
    ///
    /// Cached forecasts of the location are dropped.
    pub async fn train_location(&self, location: &LocationId) -> Result<Arc<ModelPair>, MeteocastError> {
        let coordinates = self.coordinates_of(location)?;
        let observations = self.store.series(location)?;
        let trainer = self.trainer.clone();
        let id = location.clone();
        let pair = tokio::task::spawn_blocking(move || fit(&trainer, id, coordinates, &observations)).await??;

        self.record_evaluation(&pair);
        let pair = Arc::new(pair);
        self.registry.insert(Arc::clone(&pair));
        self.cache.invalidate(location);
        Ok(pair)
    }

    /// Trains every catalog location concurrently.
    ///
    /// Successful pairs are swapped into the registry together; failures are logged and
    /// reported in the summary.
    pub async fn train_all(&self) -> TrainingSummary {
        let mut summary = TrainingSummary::default();
        let mut tasks = Vec::new();

        for (location, coordinates) in &self.catalog {
            let observations = match self.store.series(location) {
                Ok(observations) => observations,
                Err(e) => {
                    warn!("Skipping '{}': {}", location, e);
                    summary.failed.push((location.clone(), e.into()));
                    continue;
                }
            };
            let trainer = self.trainer.clone();
            let id = location.clone();
            let coordinates = *coordinates;
            tasks.push((
                location.clone(),
                tokio::task::spawn_blocking(move || fit(&trainer, id, coordinates, &observations)),
            ));
        }

        let (locations, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = join_all(handles).await;

        let mut pairs = Vec::new();
        for (location, result) in locations.into_iter().zip(results) {
            match result.map_err(MeteocastError::from).and_then(|r| r) {
                Ok(pair) => {
                    self.record_evaluation(&pair);
                    summary.trained.push(location);
                    pairs.push(pair);
                }
                Err(e) => {
                    warn!("Training '{}' failed: {}", location, e);
                    summary.failed.push((location, e));
                }
            }
        }

        self.registry.insert_all(pairs);
        for location in &summary.trained {
            self.cache.invalidate(location);
        }
        info!(
            "Trained {} locations, {} failed",
            summary.trained.len(),
            summary.failed.len()
        );
        summary
    }

    fn record_evaluation(&self, pair: &ModelPair) {
        let record = EvaluationRecord::from_pair(pair.trained_at.date_naive(), pair);
        self.evaluation.lock().push(record);
    }

    /// Forecasts hourly temperature and condition for a location.
    ///
    /// The location is either a trained location's id or coordinates, which are answered
    /// by the nearest trained location (`distance_km` reports how far away it is).
    ///
    /// # Optional Builder Methods
    ///
    /// * `.horizon_hours(usize)`: hours to forecast (default from the config, 24).
    /// * `.start(DateTime<Utc>)`: first forecast hour (default: one hour after the
    ///   newest usable stored observation).
    ///
    /// # Errors
    ///
    /// * [`MeteocastError::UnknownLocation`] for an id outside the catalog.
    /// * [`MeteocastError::NoModelAvailable`] when the location (or, for coordinates,
    ///   any location) has no trained model.
    /// * [`MeteocastError::Forecast`] when the history is too short to seed the window
    ///   or the horizon exceeds the configured maximum.
    #[builder]
    pub async fn forecast(
        &self,
        #[builder(into)] location: LocationQuery,
        horizon_hours: Option<usize>,
        start: Option<DateTime<Utc>>,
    ) -> Result<LocationForecast, MeteocastError> {
        let horizon_hours = horizon_hours.unwrap_or(self.config.default_horizon_hours);
        let (pair, distance_km) = match &location {
            LocationQuery::Id(id) => {
                let pair = self.registry.get(id).ok_or_else(|| {
                    if self.catalog.contains_key(id) {
                        MeteocastError::NoModelAvailable
                    } else {
                        MeteocastError::UnknownLocation(id.clone())
                    }
                })?;
                (pair, None)
            }
            LocationQuery::Coordinates(point) => {
                let pair = self.registry.nearest(*point).ok_or(MeteocastError::NoModelAvailable)?;
                let distance = point.distance_km(&pair.coordinates);
                debug!("Nearest model to {:?} is '{}' ({:.1} km)", point, pair.location, distance);
                (pair, Some(distance))
            }
        };

        let observations = self.store.series(&pair.location)?;
        let (series, _) = prepare_series(&observations, RequiredField::STANDARD);
        let lag = self.forecaster.lag();
        let seed = series[series.len().saturating_sub(lag)..].to_vec();
        let start = match start.or_else(|| seed.last().map(|r| r.timestamp + Duration::hours(1))) {
            Some(start) => start,
            None => {
                return Err(ForecastError::SeedWindowTooShort {
                    required: lag,
                    actual: 0,
                }
                .into())
            }
        };

        let key = ForecastKey {
            location: pair.location.clone(),
            trained_at: pair.trained_at,
            horizon_hours,
            start,
        };
        let hours = match self.cache.get(&key) {
            Some(hours) => {
                debug!("Forecast cache hit for '{}'", pair.location);
                hours
            }
            None => {
                let forecaster = self.forecaster.clone();
                let model = Arc::clone(&pair);
                let predicted = tokio::task::spawn_blocking(move || {
                    forecaster.forecast(&model, &seed, start, horizon_hours)
                })
                .await??;
                let offset = self.offset;
                let hours: Arc<Vec<ForecastHour>> = Arc::new(
                    predicted
                        .iter()
                        .map(|hour| ForecastHour::from_predicted(hour, offset))
                        .collect(),
                );
                self.cache_if_current(&pair, key, Arc::clone(&hours));
                hours
            }
        };

        Ok(LocationForecast {
            location: pair.location.clone(),
            coordinates: pair.coordinates,
            distance_km,
            hours: hours.as_ref().clone(),
        })
    }
}

impl Meteocast {
    /// Caches `hours` unless the location's model was replaced while they were
    /// being computed. Returns whether the entry was stored.
    fn cache_if_current(&self, pair: &Arc<ModelPair>, key: ForecastKey, hours: Arc<Vec<ForecastHour>>) -> bool {
        match self.registry.get(&pair.location) {
            Some(current) if Arc::ptr_eq(&current, pair) => {
                self.cache.insert(key, hours);
                true
            }
            _ => {
                debug!("Model for '{}' changed during forecast, result not cached", pair.location);
                false
            }
        }
    }
}

fn fit(
    trainer: &Trainer,
    location: LocationId,
    coordinates: LatLon,
    observations: &[Observation],
) -> Result<ModelPair, MeteocastError> {
    info!("Training '{}' on {} observations", location, observations.len());
    trainer
        .train_series(location, coordinates, observations)
        .map_err(|e| match e {
            TrainingError::InsufficientData {
                location,
                available,
                required,
            } => MeteocastError::DataInsufficient {
                location,
                available,
                required,
            },
            other => other.into(),
        })
}

fn resolve_data_dir(config: &EngineConfig) -> Result<PathBuf, MeteocastError> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => get_cache_dir(),
    }
}
