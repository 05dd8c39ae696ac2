//! Engine configuration.
//!
//! Every field has a default, so a JSON file only needs the values it changes:
//!
//! ```
//! # use meteocast::EngineConfig;
//! let config: EngineConfig = serde_json::from_str(r#"{ "lag": 12, "seed": 7 }"#).unwrap();
//! assert_eq!(config.lag, 12);
//! assert_eq!(config.default_horizon_hours, 24);
//! ```

use crate::error::MeteocastError;
use crate::forecasting::companion::CompanionStrategy;
use crate::forecasting::forecaster::Forecaster;
use crate::models::forest::ForestParams;
use crate::training::grid_search::ClassifierGrid;
use crate::training::trainer::Trainer;
use crate::types::location::{default_locations, KnownLocation};
use bon::Builder;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hours of history in each feature window.
    #[builder(default = 6)]
    pub lag: usize,
    /// Raw observations a location needs before it is trained.
    #[builder(default = 50)]
    pub min_observations: usize,
    /// Leading share of samples used for fitting; the rest is held out for metrics.
    #[builder(default = 0.8)]
    pub train_fraction: f64,
    #[builder(default = 24)]
    pub default_horizon_hours: usize,
    #[builder(default = 72)]
    pub max_horizon_hours: usize,
    #[builder(default = ForestParams::regressor())]
    pub regressor: ForestParams,
    #[builder(default = ForestParams::classifier())]
    pub classifier: ForestParams,
    #[builder(default)]
    pub classifier_grid: ClassifierGrid,
    #[builder(default = 3)]
    pub cv_folds: usize,
    #[builder(default = 42)]
    pub seed: u64,
    /// Refit both models on all samples after evaluating on the held-out split.
    #[builder(default = true)]
    pub refit_on_full_data: bool,
    #[builder(default)]
    pub companion: CompanionStrategy,
    #[builder(default = 600)]
    pub forecast_cache_ttl_secs: u64,
    /// Offset of the local clock used for day/night symbols and daily summaries.
    #[builder(default = 7)]
    pub utc_offset_hours: i32,
    #[builder(default = default_locations())]
    pub locations: Vec<KnownLocation>,
    /// Where history, models and the evaluation log live. Defaults to the user's
    /// cache directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MeteocastError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| MeteocastError::ConfigRead(path.to_path_buf(), e))?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| MeteocastError::ConfigParse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MeteocastError> {
        let invalid = |message: String| Err(MeteocastError::InvalidConfig(message));
        if self.lag == 0 {
            return invalid("lag must be at least 1".into());
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return invalid(format!("train_fraction must be in (0, 1], got {}", self.train_fraction));
        }
        if self.cv_folds < 2 {
            return invalid(format!("cv_folds must be at least 2, got {}", self.cv_folds));
        }
        if self.default_horizon_hours > self.max_horizon_hours {
            return invalid(format!(
                "default_horizon_hours ({}) exceeds max_horizon_hours ({})",
                self.default_horizon_hours, self.max_horizon_hours
            ));
        }
        if self.regressor.n_estimators == 0 || self.classifier.n_estimators == 0 {
            return invalid("forests need at least one tree".into());
        }
        if self.utc_offset().is_none() {
            return invalid(format!("utc_offset_hours {} is out of range", self.utc_offset_hours));
        }
        Ok(())
    }

    pub fn trainer(&self) -> Trainer {
        Trainer::builder()
            .lag(self.lag)
            .min_observations(self.min_observations)
            .train_fraction(self.train_fraction)
            .regressor_params(self.regressor)
            .classifier_params(self.classifier)
            .classifier_grid(self.classifier_grid.clone())
            .cv_folds(self.cv_folds)
            .seed(self.seed)
            .refit_on_full_data(self.refit_on_full_data)
            .build()
    }

    pub fn forecaster(&self) -> Forecaster {
        Forecaster::builder()
            .lag(self.lag)
            .companion(self.companion)
            .max_horizon_hours(self.max_horizon_hours)
            .seed(self.seed)
            .build()
    }

    pub fn forecast_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_cache_ttl_secs)
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.lag, 6);
        assert_eq!(config.min_observations, 50);
        assert_eq!(config.max_horizon_hours, 72);
        assert_eq!(config.forecast_cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.locations.len(), 10);
        assert_eq!(config.utc_offset(), FixedOffset::east_opt(7 * 3600));
        assert!(config.validate().is_ok());
        assert_eq!(config.trainer().lag(), 6);
        assert_eq!(config.forecaster().max_horizon_hours(), 72);
    }

    #[test]
    fn test_partial_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "lag": 4,
                "companion": { "kind": "damped_jitter", "decay": 0.2, "jitter": 0.05 },
                "classifier": { "n_estimators": 20 },
                "locations": [ { "id": "Hue", "coordinates": [16.4637, 107.5909] } ]
            }"#,
        )
        .unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.lag, 4);
        assert_eq!(config.companion, CompanionStrategy::DampedJitter { decay: 0.2, jitter: 0.05 });
        assert_eq!(config.classifier.n_estimators, 20);
        assert_eq!(config.classifier.min_samples_leaf, 1);
        assert_eq!(config.locations, vec![KnownLocation::new("Hue", 16.4637, 107.5909)]);
        assert_eq!(config.default_horizon_hours, 24);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "default_horizon_hours": 96 }"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(MeteocastError::InvalidConfig(_))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(MeteocastError::ConfigParse(_, _))
        ));

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            EngineConfig::from_json_file(&missing),
            Err(MeteocastError::ConfigRead(_, _))
        ));

        let zero_lag = EngineConfig::builder().lag(0).build();
        assert!(zero_lag.validate().is_err());
    }
}
