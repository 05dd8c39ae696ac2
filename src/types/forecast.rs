//! Output records of the forecaster and the shapes callers build API responses from.

use crate::forecasting::symbol::WeatherSymbol;
use crate::types::condition::ConditionLabel;
use crate::types::location::LatLon;
use crate::types::observation::{LocationId, RawFields};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One forecast step as produced by the autoregressive loop.
///
/// `temperature` and `condition` are model outputs. The remaining fields in
/// `synthesized` are the companion values fed back into the window; only temperature
/// is modeled, the rest are heuristics derived from the predicted condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedHour {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub condition: ConditionLabel,
    pub synthesized: RawFields,
}

/// A forecast hour in the shape exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastHour {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub condition: ConditionLabel,
    pub relative_humidity: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub cloud_fraction: f64,
    pub symbol: WeatherSymbol,
}

impl ForecastHour {
    /// Converts a predicted hour, deriving the symbol from the hour in `offset`.
    pub fn from_predicted(hour: &PredictedHour, offset: FixedOffset) -> Self {
        let local_hour = hour.timestamp.with_timezone(&offset).hour();
        Self {
            timestamp: hour.timestamp,
            temperature: hour.temperature,
            condition: hour.condition,
            relative_humidity: hour.synthesized.relative_humidity,
            precipitation: hour.synthesized.precipitation,
            wind_speed: hour.synthesized.wind_speed,
            cloud_fraction: hour.synthesized.cloud_fraction,
            symbol: WeatherSymbol::determine(
                hour.synthesized.precipitation,
                hour.synthesized.cloud_fraction,
                local_hour,
            ),
        }
    }
}

/// Aggregate of one local calendar day of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub total_precipitation: f64,
    pub mean_wind_speed: f64,
    pub mean_relative_humidity: f64,
    pub symbol: WeatherSymbol,
}

/// A complete forecast for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationForecast {
    /// The location whose model produced the forecast.
    pub location: LocationId,
    pub coordinates: LatLon,
    /// Distance from the query point to `coordinates`, when the location was resolved
    /// from coordinates.
    pub distance_km: Option<f64>,
    pub hours: Vec<ForecastHour>,
}

impl LocationForecast {
    /// Groups the hours by local date (in `offset`) and aggregates each day.
    ///
    /// The daily symbol is the most frequent symbol among daytime hours (07:00 to
    /// 16:59 local); days without daytime hours default to `clearsky_day`.
    pub fn daily_summaries(&self, offset: FixedOffset) -> Vec<DailySummary> {
        let mut days: BTreeMap<NaiveDate, Vec<&ForecastHour>> = BTreeMap::new();
        for hour in &self.hours {
            let local = hour.timestamp.with_timezone(&offset);
            days.entry(local.date_naive()).or_default().push(hour);
        }

        days.into_iter()
            .map(|(date, hours)| {
                let count = hours.len() as f64;
                let temperature_max = hours.iter().map(|h| h.temperature).fold(f64::MIN, f64::max);
                let temperature_min = hours.iter().map(|h| h.temperature).fold(f64::MAX, f64::min);

                let mut symbol_counts: HashMap<WeatherSymbol, usize> = HashMap::new();
                let mut first_seen: Vec<WeatherSymbol> = Vec::new();
                for hour in &hours {
                    let local_hour = hour.timestamp.with_timezone(&offset).hour();
                    if (7..17).contains(&local_hour) {
                        let counter = symbol_counts.entry(hour.symbol).or_insert(0);
                        if *counter == 0 {
                            first_seen.push(hour.symbol);
                        }
                        *counter += 1;
                    }
                }
                // Ties resolve to the symbol seen first.
                let mut symbol = WeatherSymbol::ClearSkyDay;
                let mut best = 0;
                for candidate in first_seen {
                    if symbol_counts[&candidate] > best {
                        best = symbol_counts[&candidate];
                        symbol = candidate;
                    }
                }

                DailySummary {
                    date,
                    temperature_max,
                    temperature_min,
                    total_precipitation: hours.iter().map(|h| h.precipitation).sum(),
                    mean_wind_speed: hours.iter().map(|h| h.wind_speed).sum::<f64>() / count,
                    mean_relative_humidity: hours.iter().map(|h| h.relative_humidity).sum::<f64>()
                        / count,
                    symbol,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn hour_at(ts: DateTime<Utc>, temperature: f64, precipitation: f64, cloud: f64) -> ForecastHour {
        let predicted = PredictedHour {
            timestamp: ts,
            temperature,
            condition: ConditionLabel::Cloudy,
            synthesized: RawFields {
                temperature,
                relative_humidity: 70.0,
                pressure: 1010.0,
                wind_speed: 3.0,
                cloud_fraction: cloud,
                precipitation,
            },
        };
        ForecastHour::from_predicted(&predicted, FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn test_daily_summaries_group_by_local_date() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let hours: Vec<_> = (0..36)
            .map(|i| hour_at(start + Duration::hours(i), 20.0 + i as f64 * 0.1, 0.5, 100.0))
            .collect();
        let forecast = LocationForecast {
            location: LocationId::new("Hanoi"),
            coordinates: LatLon(21.0, 105.8),
            distance_km: None,
            hours,
        };

        let days = forecast.daily_summaries(FixedOffset::east_opt(0).unwrap());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!((days[0].total_precipitation - 12.0).abs() < 1e-9);
        assert!((days[0].temperature_min - 20.0).abs() < 1e-9);
        assert!((days[0].temperature_max - 22.3).abs() < 1e-9);
        assert_eq!(days[0].symbol, WeatherSymbol::Rain);
    }

    #[test]
    fn test_daily_symbol_defaults_without_daytime_hours() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let hours: Vec<_> = (0..5)
            .map(|i| hour_at(start + Duration::hours(i), 18.0, 0.0, 90.0))
            .collect();
        let forecast = LocationForecast {
            location: LocationId::new("Hanoi"),
            coordinates: LatLon(21.0, 105.8),
            distance_km: None,
            hours,
        };
        let days = forecast.daily_summaries(FixedOffset::east_opt(0).unwrap());
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].symbol, WeatherSymbol::ClearSkyDay);
    }
}
