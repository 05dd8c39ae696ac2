//! Observation source backed by the MET Norway `locationforecast` API.
//!
//! The compact product carries instant values for each hour plus an optional
//! `next_1_hours` block with the symbol code and precipitation amount. Entries past
//! the first couple of days only carry 6-hour summaries; those have no `next_1_hours`
//! and are ingested without a condition code.

use crate::fetch::error::FetchError;
use crate::fetch::source::ObservationSource;
use crate::types::location::LatLon;
use crate::types::observation::{LocationId, Observation};
use async_trait::async_trait;
use bon::bon;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.met.no/weatherapi";
const DEFAULT_USER_AGENT: &str = concat!("meteocast/", env!("CARGO_PKG_VERSION"));

pub struct MetNoSource {
    client: Client,
    base_url: String,
}

#[bon]
impl MetNoSource {
    /// Creates a source for the MET Norway API.
    ///
    /// MET Norway rejects requests without an identifying `User-Agent`, so set
    /// `.user_agent(..)` to something that includes contact information for real use.
    ///
    /// ```no_run
    /// # use meteocast::fetch::met_no::MetNoSource;
    /// # use std::time::Duration;
    /// let source = MetNoSource::builder()
    ///     .user_agent("my-app/1.0 someone@example.com")
    ///     .timeout(Duration::from_secs(10))
    ///     .build()?;
    /// # Ok::<(), meteocast::fetch::error::FetchError>(())
    /// ```
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(into, default = DEFAULT_USER_AGENT.to_string())] user_agent: String,
        #[builder(default = Duration::from_secs(15))] timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, coordinates: LatLon) -> String {
        format!(
            "{}/locationforecast/2.0/compact?lat={:.4}&lon={:.4}",
            self.base_url,
            coordinates.latitude(),
            coordinates.longitude()
        )
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ObservationSource for MetNoSource {
    async fn fetch(&self, location: &LocationId, coordinates: LatLon) -> Result<Vec<Observation>, FetchError> {
        let url = self.url(coordinates);
        info!("Fetching MET Norway data for {} from {}", location, url);
        let body = self.download(&url).await?;
        let observations = parse_compact(location, &body)?;
        debug!("Parsed {} hourly entries for {}", observations.len(), location);
        Ok(observations)
    }
}

#[derive(Deserialize)]
struct CompactResponse {
    properties: Properties,
}

#[derive(Deserialize)]
struct Properties {
    timeseries: Vec<TimeStep>,
}

#[derive(Deserialize)]
struct TimeStep {
    time: DateTime<Utc>,
    data: StepData,
}

#[derive(Deserialize)]
struct StepData {
    instant: Instant,
    next_1_hours: Option<NextHour>,
}

#[derive(Deserialize)]
struct Instant {
    details: InstantDetails,
}

#[derive(Deserialize)]
struct InstantDetails {
    air_temperature: Option<f64>,
    relative_humidity: Option<f64>,
    air_pressure_at_sea_level: Option<f64>,
    wind_speed: Option<f64>,
    cloud_area_fraction: Option<f64>,
}

#[derive(Deserialize)]
struct NextHour {
    summary: Option<Summary>,
    details: Option<NextHourDetails>,
}

#[derive(Deserialize)]
struct Summary {
    // Kept loose: a non-string symbol is treated as missing rather than failing the batch.
    symbol_code: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct NextHourDetails {
    precipitation_amount: Option<f64>,
}

/// Parses a `locationforecast/2.0/compact` response body into observations for `location`.
pub fn parse_compact(location: &LocationId, body: &[u8]) -> Result<Vec<Observation>, FetchError> {
    let response: CompactResponse = serde_json::from_slice(body)?;
    Ok(response
        .properties
        .timeseries
        .into_iter()
        .map(|step| {
            let details = step.data.instant.details;
            let next = step.data.next_1_hours;
            let condition_code = next
                .as_ref()
                .and_then(|n| n.summary.as_ref())
                .and_then(|s| s.symbol_code.as_ref())
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let precipitation_last_hour = next
                .as_ref()
                .and_then(|n| n.details.as_ref())
                .and_then(|d| d.precipitation_amount);

            Observation {
                location: location.clone(),
                timestamp: step.time,
                temperature: details.air_temperature,
                relative_humidity: details.relative_humidity,
                pressure: details.air_pressure_at_sea_level,
                wind_speed: details.wind_speed,
                cloud_fraction: details.cloud_area_fraction,
                precipitation_last_hour,
                condition_code,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FIXTURE: &str = r#"{
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [105.8342, 21.0278, 12] },
        "properties": {
            "meta": { "updated_at": "2024-06-01T11:02:13Z", "units": {} },
            "timeseries": [
                {
                    "time": "2024-06-01T12:00:00Z",
                    "data": {
                        "instant": { "details": {
                            "air_pressure_at_sea_level": 1004.6,
                            "air_temperature": 31.2,
                            "cloud_area_fraction": 88.3,
                            "relative_humidity": 71.5,
                            "wind_from_direction": 140.2,
                            "wind_speed": 3.1
                        } },
                        "next_1_hours": {
                            "summary": { "symbol_code": "lightrainshowers_day" },
                            "details": { "precipitation_amount": 0.6 }
                        },
                        "next_6_hours": {
                            "summary": { "symbol_code": "rain" },
                            "details": { "precipitation_amount": 4.2 }
                        }
                    }
                },
                {
                    "time": "2024-06-03T18:00:00Z",
                    "data": {
                        "instant": { "details": {
                            "air_pressure_at_sea_level": 1006.0,
                            "air_temperature": 27.9,
                            "relative_humidity": 80.1,
                            "wind_speed": 1.4
                        } },
                        "next_6_hours": {
                            "summary": { "symbol_code": "cloudy" },
                            "details": { "precipitation_amount": 0.0 }
                        }
                    }
                },
                {
                    "time": "2024-06-01T13:00:00Z",
                    "data": {
                        "instant": { "details": { "air_temperature": 30.8 } },
                        "next_1_hours": { "summary": { "symbol_code": 17 } }
                    }
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_compact_fixture() {
        let location = LocationId::new("Hanoi");
        let observations = parse_compact(&location, FIXTURE.as_bytes()).unwrap();
        assert_eq!(observations.len(), 3);

        let first = &observations[0];
        assert_eq!(first.location, location);
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        assert_eq!(first.temperature, Some(31.2));
        assert_eq!(first.relative_humidity, Some(71.5));
        assert_eq!(first.pressure, Some(1004.6));
        assert_eq!(first.wind_speed, Some(3.1));
        assert_eq!(first.cloud_fraction, Some(88.3));
        assert_eq!(first.precipitation_last_hour, Some(0.6));
        assert_eq!(first.condition_code.as_deref(), Some("lightrainshowers_day"));

        let six_hourly = &observations[1];
        assert_eq!(six_hourly.cloud_fraction, None);
        assert_eq!(six_hourly.precipitation_last_hour, None);
        assert_eq!(six_hourly.condition_code, None);

        let odd_symbol = &observations[2];
        assert_eq!(odd_symbol.condition_code, None);
        assert_eq!(odd_symbol.precipitation_last_hour, None);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let location = LocationId::new("Hanoi");
        let result = parse_compact(&location, br#"{"properties": {}}"#);
        assert!(matches!(result, Err(FetchError::JsonParse(_))));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let source = MetNoSource::builder()
            .base_url("http://localhost:8080/weatherapi/")
            .build()
            .unwrap();
        let url = source.url(LatLon(21.0278, 105.8342));
        assert_eq!(
            url,
            "http://localhost:8080/weatherapi/locationforecast/2.0/compact?lat=21.0278&lon=105.8342"
        );
    }
}
