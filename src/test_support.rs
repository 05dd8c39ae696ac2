//! Synthetic hourly series shared by the unit tests.

use crate::models::forest::ForestParams;
use crate::training::grid_search::ClassifierGrid;
use crate::training::trainer::Trainer;
use crate::types::observation::{LocationId, Observation, PreparedObservation};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn series_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// A diurnal temperature cycle with rain every few afternoons and clear mornings.
pub fn synthetic_observations(location: &str, len: usize) -> Vec<Observation> {
    let start = series_start();
    (0..len)
        .map(|i| {
            let hour = (i % 24) as f64;
            let day = (i / 24) as f64;
            let mut o = Observation::empty(LocationId::new(location), start + Duration::hours(i as i64));
            o.temperature = Some(26.0 + 4.0 * ((hour - 9.0) * std::f64::consts::PI / 12.0).sin() + 0.3 * day);
            o.relative_humidity = Some(70.0 + (i % 7) as f64);
            o.pressure = Some(1008.0 + (i % 5) as f64 * 0.5);
            o.wind_speed = Some(2.0 + (i % 3) as f64);
            let code = match i % 24 {
                14..=16 if (i / 24) % 2 == 0 => "rainshowers_day",
                7..=11 => "clearsky_day",
                _ => "partlycloudy_night",
            };
            o.cloud_fraction = Some(match code {
                "rainshowers_day" => 95.0,
                "clearsky_day" => 5.0,
                _ => 55.0,
            });
            o.precipitation_last_hour = (code == "rainshowers_day").then_some(0.8);
            o.condition_code = Some(code.to_string());
            o
        })
        .collect()
}

pub fn synthetic_prepared(len: usize) -> Vec<PreparedObservation> {
    synthetic_observations("Hanoi", len)
        .iter()
        .map(PreparedObservation::from_observation)
        .collect()
}

/// A trainer with tiny forests and a two-point grid, quick enough for unit tests.
pub fn fast_trainer() -> Trainer {
    Trainer::builder()
        .regressor_params(ForestParams {
            n_estimators: 8,
            ..ForestParams::regressor()
        })
        .classifier_params(ForestParams {
            n_estimators: 8,
            ..ForestParams::classifier()
        })
        .classifier_grid(ClassifierGrid {
            n_estimators: vec![8],
            max_depth: vec![Some(4), None],
            min_samples_leaf: vec![1],
        })
        .build()
}
