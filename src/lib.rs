mod config;
mod error;
mod meteocast;
mod utils;

pub mod features;
pub mod fetch;
pub mod forecasting;
pub mod models;
pub mod registry;
pub mod store;
pub mod training;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use error::MeteocastError;
pub use meteocast::*;

pub use types::condition::ConditionLabel;
pub use types::forecast::{DailySummary, ForecastHour, LocationForecast, PredictedHour};
pub use types::location::{default_locations, KnownLocation, LatLon};
pub use types::observation::{LocationId, Observation, PreparedObservation, RawField, RawFields};
pub use types::required_fields::RequiredField;

pub use features::schema::FeatureSchema;
pub use fetch::error::FetchError;
pub use fetch::met_no::MetNoSource;
pub use fetch::source::ObservationSource;
pub use forecasting::companion::CompanionStrategy;
pub use forecasting::error::ForecastError;
pub use forecasting::forecaster::Forecaster;
pub use forecasting::symbol::WeatherSymbol;
pub use models::forest::{ForestParams, RandomForestClassifier, RandomForestRegressor};
pub use registry::error::RegistryError;
pub use registry::model_registry::ModelRegistry;
pub use store::error::StoreError;
pub use store::history_store::{HistoryStore, MemoryHistoryStore, MergeStats};
pub use store::parquet_store::ParquetHistoryStore;
pub use training::error::TrainingError;
pub use training::evaluation::{EvaluationLog, EvaluationRecord};
pub use training::trainer::{ModelPair, Trainer, TrainingMetrics};
