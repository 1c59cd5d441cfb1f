//! Great-circle distance and proximity ranking.
//!
//! Everything here is pure. Callers load records first, then rank them
//! against the visitor's position.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a point from latitude and longitude.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point when both halves are present.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Self::new(lat, lon))
            }
            _ => None,
        }
    }
}

/// Something with a position that can carry a computed distance.
pub trait Located {
    /// The record's position.
    fn coordinates(&self) -> Coordinates;

    /// Store the rounded distance from the ranking origin.
    fn set_distance(&mut self, km: f64);
}

/// Great-circle distance between two points in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sort `items` by distance from `origin`, nearest first.
///
/// The sort is stable, so records at equal distance keep their incoming
/// order. Without an origin the items come back untouched.
#[must_use]
pub fn rank_by_proximity<T: Located>(origin: Option<Coordinates>, items: Vec<T>) -> Vec<T> {
    let Some(origin) = origin else {
        return items;
    };

    let mut ranked: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (haversine_km(origin, item.coordinates()), item))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    ranked
        .into_iter()
        .map(|(km, mut item)| {
            item.set_distance(round1(km));
            item
        })
        .collect()
}
