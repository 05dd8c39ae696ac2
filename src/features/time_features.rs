//! Cyclical time encodings.
//!
//! Every periodic quantity is mapped onto the unit circle with
//! `sin(2π·value/period)` and `cos(2π·value/period)` (radians), so hour 23 and hour 0
//! end up next to each other instead of at opposite ends of a scale.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const HOURS_PER_DAY: f64 = 24.0;
/// Upper bound on day-of-year, leap years included.
const DAYS_PER_YEAR: f64 = 366.0;
const MONTHS_PER_YEAR: f64 = 12.0;

/// Named time feature slots, in the order they are appended to a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFeature {
    HourSin,
    HourCos,
    DayOfYearSin,
    DayOfYearCos,
    MonthSin,
    MonthCos,
    IsNight,
}

impl TimeFeature {
    pub const ALL: [TimeFeature; 7] = [
        TimeFeature::HourSin,
        TimeFeature::HourCos,
        TimeFeature::DayOfYearSin,
        TimeFeature::DayOfYearCos,
        TimeFeature::MonthSin,
        TimeFeature::MonthCos,
        TimeFeature::IsNight,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn name(&self) -> &'static str {
        match self {
            TimeFeature::HourSin => "hour_sin",
            TimeFeature::HourCos => "hour_cos",
            TimeFeature::DayOfYearSin => "day_of_year_sin",
            TimeFeature::DayOfYearCos => "day_of_year_cos",
            TimeFeature::MonthSin => "month_sin",
            TimeFeature::MonthCos => "month_cos",
            TimeFeature::IsNight => "is_night",
        }
    }
}

/// Time features of one timestamp. Stateless and deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeFeatures {
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub day_of_year_sin: f64,
    pub day_of_year_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    /// `1.0` when hour < 6 or hour > 18, else `0.0`. Hour 18 itself counts as day.
    pub is_night: f64,
}

impl TimeFeatures {
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let hour = timestamp.hour();
        let (hour_sin, hour_cos) = cyclical(hour as f64, HOURS_PER_DAY);
        let (day_of_year_sin, day_of_year_cos) = cyclical(timestamp.ordinal() as f64, DAYS_PER_YEAR);
        let (month_sin, month_cos) = cyclical(timestamp.month() as f64, MONTHS_PER_YEAR);

        Self {
            hour_sin,
            hour_cos,
            day_of_year_sin,
            day_of_year_cos,
            month_sin,
            month_cos,
            is_night: if is_night_hour(hour) { 1.0 } else { 0.0 },
        }
    }

    pub fn get(&self, feature: TimeFeature) -> f64 {
        match feature {
            TimeFeature::HourSin => self.hour_sin,
            TimeFeature::HourCos => self.hour_cos,
            TimeFeature::DayOfYearSin => self.day_of_year_sin,
            TimeFeature::DayOfYearCos => self.day_of_year_cos,
            TimeFeature::MonthSin => self.month_sin,
            TimeFeature::MonthCos => self.month_cos,
            TimeFeature::IsNight => self.is_night,
        }
    }

    pub fn to_array(&self) -> [f64; TimeFeature::COUNT] {
        TimeFeature::ALL.map(|feature| self.get(feature))
    }
}

pub fn is_night_hour(hour: u32) -> bool {
    hour < 6 || hour > 18
}

fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}
