//! Great-circle distance via the haversine formula.

use tally_types::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Whether `point` lies within `radius_m` meters of `center`.
///
/// The boundary is inclusive and no epsilon is applied: a radius of zero
/// admits only a point identical to the center.
pub fn within_radius(center: GeoPoint, radius_m: f64, point: GeoPoint) -> bool {
    distance_m(center, point) <= radius_m
}
