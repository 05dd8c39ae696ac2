//! Observation records: the raw, possibly incomplete record coming from a provider or
//! the history store, and the fixed-schema record the feature encoder works on.

use crate::types::condition::ConditionLabel;
use crate::types::required_fields::RequiredField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a forecast location (e.g. `"Hanoi"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LocationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for LocationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single hourly record for one location, as ingested.
///
/// Every measurement is optional because providers routinely emit nulls. The pair
/// (`location`, `timestamp`) is the identity of a record; the history store keeps the
/// most recently ingested value for a duplicated pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location: LocationId,
    pub timestamp: DateTime<Utc>,
    /// Air temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub relative_humidity: Option<f64>,
    /// Air pressure at sea level in hPa.
    pub pressure: Option<f64>,
    /// Wind speed in m/s.
    pub wind_speed: Option<f64>,
    /// Cloud area fraction in percent.
    pub cloud_fraction: Option<f64>,
    /// Precipitation amount over the following hour, in mm.
    pub precipitation_last_hour: Option<f64>,
    /// The provider's raw weather symbol, e.g. `"lightrain"`.
    pub condition_code: Option<String>,
}

impl Observation {
    /// An observation with only the identity set.
    pub fn empty(location: impl Into<LocationId>, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            timestamp,
            temperature: None,
            relative_humidity: None,
            pressure: None,
            wind_speed: None,
            cloud_fraction: None,
            precipitation_last_hour: None,
            condition_code: None,
        }
    }

    /// Merges data from `other` into `self`, filling in `None` fields.
    pub fn merge_from(&mut self, other: &Self) {
        if self.temperature.is_none() { self.temperature = other.temperature; }
        if self.relative_humidity.is_none() { self.relative_humidity = other.relative_humidity; }
        if self.pressure.is_none() { self.pressure = other.pressure; }
        if self.wind_speed.is_none() { self.wind_speed = other.wind_speed; }
        if self.cloud_fraction.is_none() { self.cloud_fraction = other.cloud_fraction; }
        if self.precipitation_last_hour.is_none() { self.precipitation_last_hour = other.precipitation_last_hour; }
        if self.condition_code.is_none() { self.condition_code = other.condition_code.clone(); }
    }

    /// Checks if all fields specified in `required` are `Some` and finite.
    pub fn has_required_fields(&self, required: RequiredField) -> bool {
        let present = |value: Option<f64>| value.is_some_and(f64::is_finite);
        if required.contains(RequiredField::TEMPERATURE) && !present(self.temperature) { return false; }
        if required.contains(RequiredField::RELATIVE_HUMIDITY) && !present(self.relative_humidity) { return false; }
        if required.contains(RequiredField::PRESSURE) && !present(self.pressure) { return false; }
        if required.contains(RequiredField::WIND_SPEED) && !present(self.wind_speed) { return false; }
        if required.contains(RequiredField::CLOUD_FRACTION) && !present(self.cloud_fraction) { return false; }
        if required.contains(RequiredField::PRECIPITATION) && !present(self.precipitation_last_hour) { return false; }
        true
    }

    pub fn condition(&self) -> ConditionLabel {
        ConditionLabel::from_code(self.condition_code.as_deref())
    }
}

/// The raw numeric fields that make up one lag step of a feature vector.
///
/// The declaration order is the order the fields appear in within each lag step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawField {
    Temperature,
    RelativeHumidity,
    Pressure,
    WindSpeed,
    CloudFraction,
    Precipitation,
}

impl RawField {
    pub const ALL: [RawField; 6] = [
        RawField::Temperature,
        RawField::RelativeHumidity,
        RawField::Pressure,
        RawField::WindSpeed,
        RawField::CloudFraction,
        RawField::Precipitation,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn name(&self) -> &'static str {
        match self {
            RawField::Temperature => "temperature",
            RawField::RelativeHumidity => "relative_humidity",
            RawField::Pressure => "pressure",
            RawField::WindSpeed => "wind_speed",
            RawField::CloudFraction => "cloud_fraction",
            RawField::Precipitation => "precipitation",
        }
    }
}

/// Fixed-schema numeric values of one hour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFields {
    pub temperature: f64,
    pub relative_humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub cloud_fraction: f64,
    pub precipitation: f64,
}

impl RawFields {
    pub fn get(&self, field: RawField) -> f64 {
        match field {
            RawField::Temperature => self.temperature,
            RawField::RelativeHumidity => self.relative_humidity,
            RawField::Pressure => self.pressure,
            RawField::WindSpeed => self.wind_speed,
            RawField::CloudFraction => self.cloud_fraction,
            RawField::Precipitation => self.precipitation,
        }
    }

    pub fn set(&mut self, field: RawField, value: f64) {
        match field {
            RawField::Temperature => self.temperature = value,
            RawField::RelativeHumidity => self.relative_humidity = value,
            RawField::Pressure => self.pressure = value,
            RawField::WindSpeed => self.wind_speed = value,
            RawField::CloudFraction => self.cloud_fraction = value,
            RawField::Precipitation => self.precipitation = value,
        }
    }

    /// The values in [`RawField::ALL`] order.
    pub fn to_array(&self) -> [f64; RawField::COUNT] {
        RawField::ALL.map(|field| self.get(field))
    }
}

/// A preprocessed hour: timestamp, numeric fields and the mapped condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreparedObservation {
    pub timestamp: DateTime<Utc>,
    pub values: RawFields,
    pub condition: ConditionLabel,
}

impl PreparedObservation {
    /// Builds a prepared record from a raw one. Missing values become `NaN` and are
    /// left to the encoder's sanitization; precipitation defaults to zero.
    pub fn from_observation(observation: &Observation) -> Self {
        let or_nan = |value: Option<f64>| value.unwrap_or(f64::NAN);
        Self {
            timestamp: observation.timestamp,
            values: RawFields {
                temperature: or_nan(observation.temperature),
                relative_humidity: or_nan(observation.relative_humidity),
                pressure: or_nan(observation.pressure),
                wind_speed: or_nan(observation.wind_speed),
                cloud_fraction: or_nan(observation.cloud_fraction),
                precipitation: observation.precipitation_last_hour.unwrap_or(0.0),
            },
            condition: observation.condition(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_from_fills_only_missing() {
        let mut a = Observation::empty("Hanoi", ts(0));
        a.temperature = Some(30.0);
        let mut b = Observation::empty("Hanoi", ts(0));
        b.temperature = Some(10.0);
        b.pressure = Some(1008.0);
        b.condition_code = Some("rain".to_string());

        a.merge_from(&b);
        assert_eq!(a.temperature, Some(30.0));
        assert_eq!(a.pressure, Some(1008.0));
        assert_eq!(a.condition(), ConditionLabel::Rain);
    }

    #[test]
    fn test_required_fields_reject_nan() {
        let mut obs = Observation::empty("Hanoi", ts(1));
        obs.temperature = Some(f64::NAN);
        obs.relative_humidity = Some(80.0);
        assert!(!obs.has_required_fields(RequiredField::TEMPERATURE));
        assert!(obs.has_required_fields(RequiredField::RELATIVE_HUMIDITY));
        assert!(obs.has_required_fields(RequiredField::NONE));
    }

    #[test]
    fn test_prepared_zero_fills_precipitation() {
        let mut obs = Observation::empty("Hanoi", ts(2));
        obs.temperature = Some(25.0);
        let prepared = PreparedObservation::from_observation(&obs);
        assert_eq!(prepared.values.precipitation, 0.0);
        assert!(prepared.values.pressure.is_nan());
        assert_eq!(prepared.condition, ConditionLabel::Cloudy);
    }

    #[test]
    fn test_raw_fields_array_order() {
        let fields = RawFields {
            temperature: 1.0,
            relative_humidity: 2.0,
            pressure: 3.0,
            wind_speed: 4.0,
            cloud_fraction: 5.0,
            precipitation: 6.0,
        };
        assert_eq!(fields.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
