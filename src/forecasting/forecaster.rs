use crate::features::encoder::{FeatureEncoder, Sanitizer};
use crate::features::schema::FeatureSchema;
use crate::forecasting::companion::{CompanionStrategy, CompanionSynthesizer};
use crate::forecasting::error::ForecastError;
use crate::models::{Classifier, Regressor};
use crate::training::trainer::ModelPair;
use crate::types::forecast::PredictedHour;
use crate::types::observation::{PreparedObservation, RawField, RawFields};
use bon::Builder;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::VecDeque;

/// The last `lag` hours fed to the models, oldest first.
#[derive(Debug, Clone)]
pub struct ForecastWindow {
    records: VecDeque<PreparedObservation>,
    lag: usize,
}

impl ForecastWindow {
    /// Takes the last `lag` records of `seed`. Shorter seeds are rejected.
    pub fn from_seed(seed: &[PreparedObservation], lag: usize) -> Result<Self, ForecastError> {
        if seed.len() < lag {
            return Err(ForecastError::SeedWindowTooShort {
                required: lag,
                actual: seed.len(),
            });
        }
        Ok(Self {
            records: seed[seed.len() - lag..].iter().copied().collect(),
            lag,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn newest(&self) -> Option<&PreparedObservation> {
        self.records.back()
    }

    /// Appends `record` and drops the oldest one, keeping the length at `lag`.
    pub fn push(&mut self, record: PreparedObservation) {
        self.records.push_back(record);
        while self.records.len() > self.lag {
            self.records.pop_front();
        }
    }

    pub fn as_slice(&mut self) -> &[PreparedObservation] {
        self.records.make_contiguous()
    }
}

/// Rolls a [`ModelPair`] forward hour by hour.
#[derive(Debug, Clone, Builder)]
pub struct Forecaster {
    #[builder(default = 6)]
    lag: usize,
    #[builder(default)]
    companion: CompanionStrategy,
    #[builder(default = 72)]
    max_horizon_hours: usize,
    #[builder(default = 42)]
    seed: u64,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Forecaster {
    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn max_horizon_hours(&self) -> usize {
        self.max_horizon_hours
    }

    /// Predicts `horizon_hours` consecutive hours starting at `start`.
    ///
    /// Each step encodes the current window with the time features of the step's
    /// timestamp, predicts temperature and condition, then appends a synthesized
    /// record built from the predictions and slides the window by one hour.
    pub fn forecast(
        &self,
        pair: &ModelPair,
        seed_window: &[PreparedObservation],
        start: DateTime<Utc>,
        horizon_hours: usize,
    ) -> Result<Vec<PredictedHour>, ForecastError> {
        if horizon_hours > self.max_horizon_hours {
            return Err(ForecastError::HorizonTooLong {
                requested: horizon_hours,
                max: self.max_horizon_hours,
            });
        }

        let schema = FeatureSchema::new(self.lag);
        check_schema(pair, &schema)?;

        let mut window = ForecastWindow::from_seed(seed_window, self.lag)?;
        let encoder = FeatureEncoder::new(schema);
        let mut sanitizer = Sanitizer::new(encoder.schema().len());
        let mut companions = CompanionSynthesizer::new(self.companion, window.as_slice(), self.seed);
        let mut previous = newest_finite(window.as_slice());

        let mut hours = Vec::with_capacity(horizon_hours);
        for step in 0..horizon_hours {
            let timestamp = start + Duration::hours(step as i64);

            let mut features = encoder.encode(window.as_slice(), timestamp)?;
            let replaced = sanitizer.sanitize(&mut features);
            if replaced > 0 {
                debug!("'{}' step {}: sanitized {} features", pair.location, step, replaced);
            }

            let temperature = pair.regressor.predict(&features)?;
            let class = pair.classifier.predict(&features)?;
            let condition = pair.label_encoder.decode(class)?;

            let synthesized = companions.next(&previous, temperature, condition);
            hours.push(PredictedHour {
                timestamp,
                temperature,
                condition,
                synthesized,
            });

            window.push(PreparedObservation {
                timestamp,
                values: synthesized,
                condition,
            });
            previous = synthesized;
        }

        Ok(hours)
    }
}

fn check_schema(pair: &ModelPair, expected: &FeatureSchema) -> Result<(), ForecastError> {
    let consistent = pair.schema == *expected
        && pair.regressor.n_features() == expected.len()
        && pair.classifier.n_features() == expected.len();
    if consistent {
        return Ok(());
    }
    Err(ForecastError::SchemaMismatch {
        model_version: pair.schema.version(),
        model_len: pair.schema.len(),
        expected_version: expected.version(),
        expected_len: expected.len(),
    })
}

/// The newest record's values with non-finite fields taken from older records,
/// or zero when no record has a finite value.
fn newest_finite(window: &[PreparedObservation]) -> RawFields {
    let mut values = RawFields::default();
    for field in RawField::ALL {
        let value = window
            .iter()
            .rev()
            .map(|record| record.values.get(field))
            .find(|v| v.is_finite())
            .unwrap_or(0.0);
        values.set(field, value);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::preprocess::prepare_series;
    use crate::test_support::{fast_trainer, synthetic_observations};
    use crate::types::location::LatLon;
    use crate::types::observation::LocationId;
    use crate::types::required_fields::RequiredField;

    fn trained() -> (ModelPair, Vec<PreparedObservation>) {
        let observations = synthetic_observations("Hanoi", 100);
        let pair = fast_trainer()
            .train_series(LocationId::new("Hanoi"), LatLon(21.0, 105.8), &observations)
            .unwrap();
        let (series, _) = prepare_series(&observations, RequiredField::STANDARD);
        (pair, series)
    }

    #[test]
    fn test_twenty_four_hourly_finite_forecasts() {
        let (pair, series) = trained();
        let start = series.last().unwrap().timestamp + Duration::hours(1);
        let hours = Forecaster::default().forecast(&pair, &series, start, 24).unwrap();

        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0].timestamp, start);
        for w in hours.windows(2) {
            assert_eq!(w[1].timestamp - w[0].timestamp, Duration::hours(1));
        }
        for hour in &hours {
            assert!(hour.temperature.is_finite());
            assert!(hour.synthesized.to_array().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_seed_window_too_short() {
        let (pair, series) = trained();
        let result = Forecaster::default().forecast(&pair, &series[..5], Utc::now(), 3);
        assert!(matches!(
            result,
            Err(ForecastError::SeedWindowTooShort { required: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_longer_seed_uses_last_lag_records() {
        let (pair, series) = trained();
        let start = series.last().unwrap().timestamp + Duration::hours(1);
        let forecaster = Forecaster::default();
        let from_full = forecaster.forecast(&pair, &series, start, 6).unwrap();
        let from_tail = forecaster.forecast(&pair, &series[series.len() - 6..], start, 6).unwrap();
        assert_eq!(from_full, from_tail);
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let (pair, series) = trained();
        let forecaster = Forecaster::builder().lag(4).build();
        let result = forecaster.forecast(&pair, &series, Utc::now(), 2);
        assert!(matches!(
            result,
            Err(ForecastError::SchemaMismatch { model_len: 43, expected_len: 31, .. })
        ));
    }

    #[test]
    fn test_horizon_limit_and_zero_horizon() {
        let (pair, series) = trained();
        let forecaster = Forecaster::builder().max_horizon_hours(10).build();
        assert!(matches!(
            forecaster.forecast(&pair, &series, Utc::now(), 11),
            Err(ForecastError::HorizonTooLong { requested: 11, max: 10 })
        ));
        assert!(forecaster.forecast(&pair, &series, Utc::now(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_window_slides() {
        let series = crate::test_support::synthetic_prepared(10);
        let mut window = ForecastWindow::from_seed(&series, 3).unwrap();
        assert_eq!(window.as_slice()[0].timestamp, series[7].timestamp);
        window.push(series[0]);
        assert_eq!(window.len(), 3);
        assert_eq!(window.as_slice()[0].timestamp, series[8].timestamp);
        assert_eq!(window.newest().map(|r| r.timestamp), Some(series[0].timestamp));
    }
}
