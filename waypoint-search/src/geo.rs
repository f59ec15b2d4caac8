//! Great-circle distance between coordinates.

use crate::types::Location;

/// Mean Earth radius in meters, as used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates in meters, rounded to the
/// nearest meter.
pub fn haversine_distance_m(a: Location, b: Location) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lng / 2.0).sin().powi(2);
    let central_angle = 2.0 * h.sqrt().asin();

    (EARTH_RADIUS_M * central_angle).round()
}

/// Distance from an optional origin to an optional point.
///
/// Returns `Some` only when both coordinates are present, which is exactly
/// the invariant `PlaceResult.distance_m` carries.
pub fn distance_between(origin: Option<Location>, point: Option<Location>) -> Option<f64> {
    match (origin, point) {
        (Some(origin), Some(point)) => Some(haversine_distance_m(origin, point)),
        _ => None,
    }
}
