//! Geographic types for forecast locations, including the implementations needed to
//! index them in an `rstar` R-tree.

use crate::types::observation::LocationId;
use haversine::{distance, Location as HaversineLocation, Units};
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use meteocast::LatLon;
///
/// let hanoi = LatLon(21.0285, 105.8542);
/// assert_eq!(hanoi.0, 21.0285); // Latitude
/// assert_eq!(hanoi.1, 105.8542); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }

    /// Squared Euclidean distance in degree space. No geodesic correction; used for
    /// nearest-location ranking only.
    pub fn squared_distance(&self, other: &LatLon) -> f64 {
        let dx = self.0 - other.0;
        let dy = self.1 - other.1;
        dx * dx + dy * dy
    }

    /// Great-circle distance in kilometers, for reporting.
    pub fn distance_km(&self, other: &LatLon) -> f64 {
        distance(
            HaversineLocation {
                latitude: self.0,
                longitude: self.1,
            },
            HaversineLocation {
                latitude: other.0,
                longitude: other.1,
            },
            Units::Kilometers,
        )
    }
}

/// A named location the engine collects data for and trains a model on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLocation {
    pub id: LocationId,
    pub coordinates: LatLon,
}

impl KnownLocation {
    pub fn new(id: impl Into<LocationId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            coordinates: LatLon(latitude, longitude),
        }
    }
}

/// The ten Vietnamese cities the data collector tracks by default.
pub fn default_locations() -> Vec<KnownLocation> {
    vec![
        KnownLocation::new("Buon Ma Thuot", 12.6683, 108.0435),
        KnownLocation::new("Ca Mau", 9.1768, 105.1531),
        KnownLocation::new("Ha Tinh", 18.3442, 105.9089),
        KnownLocation::new("Hanoi", 21.0285, 105.8542),
        KnownLocation::new("Haiphong", 20.8449, 106.6881),
        KnownLocation::new("Ho Chi Minh City", 10.7769, 106.7009),
        KnownLocation::new("Nha Trang", 12.2458, 109.1897),
        KnownLocation::new("Da Nang", 16.0544, 108.2022),
        KnownLocation::new("Lang Son", 21.8524, 106.7589),
        KnownLocation::new("Lao Cai", 22.4848, 103.9515),
    ]
}

// --- R-Tree Implementations ---

/// A location is a point: its envelope is the degenerate box at (latitude, longitude).
impl RTreeObject for KnownLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.coordinates.0, self.coordinates.1])
    }
}

impl PointDistance for KnownLocation {
    /// Squared Euclidean distance between the location and a `[lat, lon]` query point,
    /// treating degrees as Cartesian coordinates.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.coordinates.squared_distance(&LatLon(point[0], point[1]))
    }
}
