//! Display symbols derived from forecast quantities.

use serde::{Deserialize, Serialize};
use std::fmt;

const HEAVY_RAIN_MM: f64 = 2.0;
const RAIN_MM: f64 = 0.2;
const CLOUDY_PERCENT: f64 = 80.0;
const PARTLY_CLOUDY_PERCENT: f64 = 40.0;

/// Weather icon identifier, named after MET Norway's symbol codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherSymbol {
    #[serde(rename = "heavyrain")]
    HeavyRain,
    #[serde(rename = "rain")]
    Rain,
    #[serde(rename = "cloudy")]
    Cloudy,
    #[serde(rename = "partlycloudy_day")]
    PartlyCloudyDay,
    #[serde(rename = "partlycloudy_night")]
    PartlyCloudyNight,
    #[serde(rename = "clearsky_day")]
    ClearSkyDay,
    #[serde(rename = "clearsky_night")]
    ClearSkyNight,
}

impl WeatherSymbol {
    pub const ALL: [WeatherSymbol; 7] = [
        WeatherSymbol::HeavyRain,
        WeatherSymbol::Rain,
        WeatherSymbol::Cloudy,
        WeatherSymbol::PartlyCloudyDay,
        WeatherSymbol::PartlyCloudyNight,
        WeatherSymbol::ClearSkyDay,
        WeatherSymbol::ClearSkyNight,
    ];

    /// Picks a symbol from precipitation (mm), cloud cover (%) and the local hour.
    ///
    /// Daytime is `6 <= hour < 18`. Note this differs from the `is_night` time feature,
    /// which treats hour 18 as day.
    pub fn determine(precipitation: f64, cloud_fraction: f64, hour: u32) -> Self {
        let is_day = (6..18).contains(&hour);

        if precipitation > HEAVY_RAIN_MM {
            return WeatherSymbol::HeavyRain;
        }
        if precipitation > RAIN_MM {
            return WeatherSymbol::Rain;
        }
        if cloud_fraction > CLOUDY_PERCENT {
            return WeatherSymbol::Cloudy;
        }
        if cloud_fraction > PARTLY_CLOUDY_PERCENT {
            return if is_day {
                WeatherSymbol::PartlyCloudyDay
            } else {
                WeatherSymbol::PartlyCloudyNight
            };
        }
        if is_day {
            WeatherSymbol::ClearSkyDay
        } else {
            WeatherSymbol::ClearSkyNight
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WeatherSymbol::HeavyRain => "heavyrain",
            WeatherSymbol::Rain => "rain",
            WeatherSymbol::Cloudy => "cloudy",
            WeatherSymbol::PartlyCloudyDay => "partlycloudy_day",
            WeatherSymbol::PartlyCloudyNight => "partlycloudy_night",
            WeatherSymbol::ClearSkyDay => "clearsky_day",
            WeatherSymbol::ClearSkyNight => "clearsky_night",
        }
    }
}

impl fmt::Display for WeatherSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
