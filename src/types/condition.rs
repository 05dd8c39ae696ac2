//! Defines the `ConditionLabel` enum, collapsing a provider's free-form weather symbol
//! codes into the small closed taxonomy the classifier is trained on.

use serde::{Deserialize, Serialize};
use std::fmt;

const RAIN_CUES: [&str; 5] = ["rain", "sleet", "shower", "snow", "drizzle"];
const CLEAR_CUES: [&str; 2] = ["clearsky_day", "fair_day"];

/// The weather condition category predicted for an hour.
///
/// The vocabulary is closed and identical for every location. Raw provider codes
/// (for example MET Norway's `symbol_code`, such as `"lightrainshowers_day"`) are
/// mapped onto it with [`ConditionLabel::from_code`].
///
/// The derived `Ord` follows declaration order and is what the per-location
/// label encoder sorts its vocabulary by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionLabel {
    /// Any precipitation: rain, sleet, showers, snow or drizzle.
    Rain,
    /// Clear or fair sky during the day.
    Clear,
    /// Everything else, including missing and unrecognised codes.
    Cloudy,
}

impl ConditionLabel {
    /// Every label of the taxonomy, in encoder order.
    pub const ALL: [ConditionLabel; 3] = [
        ConditionLabel::Rain,
        ConditionLabel::Clear,
        ConditionLabel::Cloudy,
    ];

    /// The label used for missing, non-string or unrecognised codes.
    pub const DEFAULT: ConditionLabel = ConditionLabel::Cloudy;

    /// Maps a raw provider code to a label.
    ///
    /// Matching is case-insensitive and substring based. Rain cues are tested
    /// before clear-sky cues, so a code carrying both (e.g. `"rain_fair_day"`)
    /// is `Rain`. `None` yields [`ConditionLabel::DEFAULT`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use meteocast::ConditionLabel;
    ///
    /// assert_eq!(ConditionLabel::from_code(Some("LightRainShowers_day")), ConditionLabel::Rain);
    /// assert_eq!(ConditionLabel::from_code(Some("clearsky_day")), ConditionLabel::Clear);
    /// assert_eq!(ConditionLabel::from_code(Some("clearsky_night")), ConditionLabel::Cloudy);
    /// assert_eq!(ConditionLabel::from_code(None), ConditionLabel::Cloudy);
    /// ```
    pub fn from_code(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return Self::DEFAULT;
        };
        let lower = code.to_lowercase();
        if RAIN_CUES.iter().any(|cue| lower.contains(cue)) {
            return ConditionLabel::Rain;
        }
        if CLEAR_CUES.iter().any(|cue| lower.contains(cue)) {
            return ConditionLabel::Clear;
        }
        Self::DEFAULT
    }

    /// Maps an arbitrary JSON value. Anything that is not a string (null, numbers,
    /// objects) falls into the default bucket instead of failing.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self::from_code(value.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionLabel::Rain => "rain",
            ConditionLabel::Clear => "clear",
            ConditionLabel::Cloudy => "cloudy",
        }
    }
}

impl Default for ConditionLabel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ConditionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
