use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A point on the sphere in GeoJSON order: longitude first, latitude second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Validates a raw `[longitude, latitude]` pair. Anything that is not a
    /// two-element numeric array is rejected.
    pub fn from_pair(pair: &[f64]) -> Option<Self> {
        match pair {
            [lon, lat] => Some(Self {
                lon: *lon,
                lat: *lat,
            }),
            _ => None,
        }
    }
}

/// Great-circle distance in kilometers, spherical Earth of radius 6371 km.
/// Good enough for nearest-driver ranking, not for navigation.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lon = (delta_lon / 2.0).sin();

    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Rounds to two decimal places, the precision stored on a delivery.
pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}
