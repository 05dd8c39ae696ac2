use crate::features::error::FeatureError;
use crate::features::schema::{FeatureSchema, FeatureSlot};
use crate::features::time_features::TimeFeatures;
use crate::types::observation::PreparedObservation;
use chrono::{DateTime, Utc};
use log::debug;

/// Turns a lag window plus a target timestamp into a flat feature vector laid out by
/// a [`FeatureSchema`].
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn with_lag(lag: usize) -> Self {
        Self::new(FeatureSchema::new(lag))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encodes `window` (oldest first, exactly `lag` records) and the time features of
    /// `target`. Values are copied as-is; non-finite entries are left for
    /// [`Sanitizer::sanitize`].
    pub fn encode(
        &self,
        window: &[PreparedObservation],
        target: DateTime<Utc>,
    ) -> Result<Vec<f64>, FeatureError> {
        if window.len() != self.schema.lag() {
            return Err(FeatureError::WindowLength {
                expected: self.schema.lag(),
                actual: window.len(),
            });
        }

        let time = TimeFeatures::from_timestamp(target);
        let vector = self
            .schema
            .slots()
            .iter()
            .map(|slot| match slot {
                FeatureSlot::Lag { position, field } => window[*position].values.get(*field),
                FeatureSlot::Time(feature) => time.get(*feature),
            })
            .collect();
        Ok(vector)
    }
}

/// Replaces non-finite feature values.
///
/// A non-finite value takes the last finite value seen in the same slot by this
/// sanitizer, or `0.0` when the slot has never held one. Reuse one sanitizer across a
/// series of vectors (training samples, forecast steps) so the fallback tracks it.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    last_valid: Vec<Option<f64>>,
}

impl Sanitizer {
    pub fn new(len: usize) -> Self {
        Self {
            last_valid: vec![None; len],
        }
    }

    /// Sanitizes `vector` in place and returns how many values were replaced.
    pub fn sanitize(&mut self, vector: &mut [f64]) -> usize {
        if self.last_valid.len() < vector.len() {
            self.last_valid.resize(vector.len(), None);
        }

        let mut replaced = 0;
        for (value, last) in vector.iter_mut().zip(self.last_valid.iter_mut()) {
            if value.is_finite() {
                *last = Some(*value);
            } else {
                *value = last.unwrap_or(0.0);
                replaced += 1;
            }
        }
        if replaced > 0 {
            debug!("Replaced {} non-finite feature values", replaced);
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::time_features::TimeFeature;
    use crate::types::condition::ConditionLabel;
    use crate::types::observation::{RawField, RawFields};
    use chrono::{Duration, TimeZone};

    fn record(ts: DateTime<Utc>, temperature: f64) -> PreparedObservation {
        PreparedObservation {
            timestamp: ts,
            values: RawFields {
                temperature,
                relative_humidity: 80.0,
                pressure: 1010.0,
                wind_speed: 2.0,
                cloud_fraction: 50.0,
                precipitation: 0.0,
            },
            condition: ConditionLabel::Cloudy,
        }
    }

    #[test]
    fn test_encode_places_values_by_schema() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let window: Vec<_> = (0..3)
            .map(|i| record(start + Duration::hours(i), 20.0 + i as f64))
            .collect();
        let target = start + Duration::hours(3);
        let encoder = FeatureEncoder::with_lag(3);

        let vector = encoder.encode(&window, target).unwrap();
        assert_eq!(vector.len(), 3 * RawField::COUNT + TimeFeature::COUNT);
        assert_eq!(vector[0], 20.0);
        assert_eq!(vector[RawField::COUNT], 21.0);
        assert_eq!(vector[2 * RawField::COUNT], 22.0);

        let time = TimeFeatures::from_timestamp(target).to_array();
        assert_eq!(&vector[3 * RawField::COUNT..], &time[..]);
    }

    #[test]
    fn test_encode_rejects_wrong_window_length() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let window = vec![record(start, 20.0)];
        let result = FeatureEncoder::with_lag(2).encode(&window, start);
        assert!(matches!(
            result,
            Err(FeatureError::WindowLength { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_sanitize_uses_last_valid_then_zero() {
        let mut sanitizer = Sanitizer::new(3);

        let mut first = vec![f64::NAN, 5.0, f64::INFINITY];
        assert_eq!(sanitizer.sanitize(&mut first), 2);
        assert_eq!(first, vec![0.0, 5.0, 0.0]);

        let mut second = vec![7.0, f64::NAN, 1.0];
        assert_eq!(sanitizer.sanitize(&mut second), 1);
        assert_eq!(second, vec![7.0, 5.0, 1.0]);

        let mut third = vec![f64::NEG_INFINITY, 2.0, f64::NAN];
        assert_eq!(sanitizer.sanitize(&mut third), 2);
        assert_eq!(third, vec![7.0, 2.0, 1.0]);
    }
}
