use crate::fetch::error::FetchError;
use crate::forecasting::error::ForecastError;
use crate::registry::error::RegistryError;
use crate::store::error::StoreError;
use crate::training::error::TrainingError;
use crate::types::observation::LocationId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeteocastError {
    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Not enough data for '{location}': {available} observations, {required} required")]
    DataInsufficient {
        location: LocationId,
        available: usize,
        required: usize,
    },

    #[error("Unknown location '{0}'")]
    UnknownLocation(LocationId),

    #[error("No trained model is available")]
    NoModelAvailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
