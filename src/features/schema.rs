//! The feature vector layout shared by the sample builder and the forecaster.
//!
//! A model pair stores the schema it was trained under and the forecaster refuses to
//! feed it vectors built under a different one, so the column order used at training
//! time and at inference time cannot drift apart silently.

use crate::features::time_features::TimeFeature;
use crate::types::observation::RawField;
use serde::{Deserialize, Serialize};

/// Bumped whenever the slot order or the set of slots changes.
pub const SCHEMA_VERSION: u32 = 1;

/// One named position of a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSlot {
    /// A raw field of the window record at `position` (0 = oldest).
    Lag { position: usize, field: RawField },
    /// A time feature of the target timestamp.
    Time(TimeFeature),
}

impl FeatureSlot {
    pub fn name(&self, lag: usize) -> String {
        match self {
            // t-1 is the newest record of the window.
            FeatureSlot::Lag { position, field } => {
                format!("{}_lag_{}", field.name(), lag - position)
            }
            FeatureSlot::Time(feature) => feature.name().to_string(),
        }
    }
}

/// Ordered list of feature slots for a given lag.
///
/// Layout: lag-then-field. For each window record, oldest first, the six
/// [`RawField`]s in declaration order; then the seven [`TimeFeature`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    lag: usize,
    slots: Vec<FeatureSlot>,
}

impl FeatureSchema {
    pub fn new(lag: usize) -> Self {
        let mut slots = Vec::with_capacity(lag * RawField::COUNT + TimeFeature::COUNT);
        for position in 0..lag {
            for field in RawField::ALL {
                slots.push(FeatureSlot::Lag { position, field });
            }
        }
        slots.extend(TimeFeature::ALL.into_iter().map(FeatureSlot::Time));
        Self {
            version: SCHEMA_VERSION,
            lag,
            slots,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    /// Vector length: `lag * 6 + 7`.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name(self.lag)).collect()
    }

    /// Index of a lag slot, for callers that need to read a specific value back.
    pub fn index_of(&self, slot: FeatureSlot) -> Option<usize> {
        self.slots.iter().position(|s| *s == slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_matches_formula() {
        for lag in [1, 4, 6, 24] {
            let schema = FeatureSchema::new(lag);
            assert_eq!(schema.len(), lag * RawField::COUNT + TimeFeature::COUNT);
        }
    }

    #[test]
    fn test_layout_is_lag_then_field() {
        let schema = FeatureSchema::new(2);
        assert_eq!(
            schema.slots()[0],
            FeatureSlot::Lag { position: 0, field: RawField::Temperature }
        );
        assert_eq!(
            schema.slots()[5],
            FeatureSlot::Lag { position: 0, field: RawField::Precipitation }
        );
        assert_eq!(
            schema.slots()[6],
            FeatureSlot::Lag { position: 1, field: RawField::Temperature }
        );
        assert_eq!(schema.slots()[12], FeatureSlot::Time(TimeFeature::HourSin));
        assert_eq!(schema.slots()[18], FeatureSlot::Time(TimeFeature::IsNight));
    }

    #[test]
    fn test_slot_names() {
        let names = FeatureSchema::new(2).slot_names();
        assert_eq!(names[0], "temperature_lag_2");
        assert_eq!(names[6], "temperature_lag_1");
        assert_eq!(names.last().map(String::as_str), Some("is_night"));
    }
}
