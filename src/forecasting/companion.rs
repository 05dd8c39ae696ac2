//! Heuristics for the fields the models do not predict.
//!
//! Only temperature and condition are modeled. The other raw fields of a synthesized
//! hour are approximations: precipitation and cloud cover follow the predicted
//! condition, humidity, pressure and wind follow a [`CompanionStrategy`].

use crate::types::condition::ConditionLabel;
use crate::types::observation::{PreparedObservation, RawField, RawFields};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Precipitation (mm) and cloud fraction (%) assumed for a predicted condition.
pub fn condition_companions(condition: ConditionLabel) -> (f64, f64) {
    match condition {
        ConditionLabel::Rain => (0.5, 100.0),
        ConditionLabel::Clear => (0.0, 10.0),
        ConditionLabel::Cloudy => (0.0, 60.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompanionStrategy {
    /// Repeat the previous hour's humidity, pressure and wind.
    CarryForward,
    /// Relax each field from the previous hour toward its seed-window mean by
    /// `decay` (0 to 1) and add a uniform perturbation of at most `jitter` times the
    /// field's seed-window spread (at least 1 unit).
    DampedJitter { decay: f64, jitter: f64 },
}

impl Default for CompanionStrategy {
    fn default() -> Self {
        CompanionStrategy::CarryForward
    }
}

const COMPANION_FIELDS: [RawField; 3] = [
    RawField::RelativeHumidity,
    RawField::Pressure,
    RawField::WindSpeed,
];

/// Produces the companion fields step by step for one forecast run.
#[derive(Debug, Clone)]
pub struct CompanionSynthesizer {
    strategy: CompanionStrategy,
    anchors: RawFields,
    spreads: RawFields,
    rng: ChaCha8Rng,
}

impl CompanionSynthesizer {
    pub fn new(strategy: CompanionStrategy, seed_window: &[PreparedObservation], seed: u64) -> Self {
        let mut anchors = RawFields::default();
        let mut spreads = RawFields::default();
        for field in COMPANION_FIELDS {
            let values: Vec<f64> = seed_window
                .iter()
                .map(|record| record.values.get(field))
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                continue;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            anchors.set(field, mean);
            spreads.set(field, max - min);
        }
        Self {
            strategy,
            anchors,
            spreads,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Builds the next hour from the previous one, the predicted temperature and
    /// the predicted condition.
    pub fn next(&mut self, previous: &RawFields, temperature: f64, condition: ConditionLabel) -> RawFields {
        let (precipitation, cloud_fraction) = condition_companions(condition);
        let mut next = RawFields {
            temperature,
            precipitation,
            cloud_fraction,
            ..*previous
        };

        if let CompanionStrategy::DampedJitter { decay, jitter } = self.strategy {
            let decay = decay.clamp(0.0, 1.0);
            for field in COMPANION_FIELDS {
                let prev = previous.get(field);
                let anchor = self.anchors.get(field);
                let amplitude = jitter.abs() * self.spreads.get(field).max(1.0);
                let noise = if amplitude > 0.0 {
                    self.rng.gen_range(-amplitude..=amplitude)
                } else {
                    0.0
                };
                next.set(field, prev + decay * (anchor - prev) + noise);
            }
        }

        clamp_physical(&mut next);
        next
    }
}

fn clamp_physical(values: &mut RawFields) {
    values.relative_humidity = values.relative_humidity.clamp(0.0, 100.0);
    values.cloud_fraction = values.cloud_fraction.clamp(0.0, 100.0);
    values.wind_speed = values.wind_speed.max(0.0);
    values.precipitation = values.precipitation.max(0.0);
    values.pressure = values.pressure.clamp(870.0, 1085.0);
}
