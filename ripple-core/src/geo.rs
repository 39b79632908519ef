//! Great-circle distances for proximity listings.

use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_KM;

/// A caller-supplied position hint, e.g. the last fix of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location {
            latitude,
            longitude,
            city: String::new(),
            country: String::new(),
        }
    }

    pub fn distance_to(&self, latitude: Option<f64>, longitude: Option<f64>) -> f64 {
        distance_km(
            Some(self.latitude),
            Some(self.longitude),
            latitude,
            longitude,
        )
    }
}

/// Haversine distance in kilometers.
///
/// Returns `f64::INFINITY` when any coordinate is missing or NaN, so such
/// entries sort after every located one.
pub fn distance_km(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> f64 {
    let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (lat1, lon1, lat2, lon2) else {
        return f64::INFINITY;
    };
    if [lat1, lon1, lat2, lon2].iter().any(|c| c.is_nan()) {
        return f64::INFINITY;
    }

    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}
