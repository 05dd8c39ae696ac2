use crate::fetch::error::FetchError;
use crate::types::location::LatLon;
use crate::types::observation::{LocationId, Observation};
use async_trait::async_trait;

/// A provider of recent hourly observations or short-range forecasts for a point.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self, location: &LocationId, coordinates: LatLon) -> Result<Vec<Observation>, FetchError>;
}
