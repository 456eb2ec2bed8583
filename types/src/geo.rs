//! Geographic coordinates and fences.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite latitude in [-90, 90] and finite longitude in [-180, 180].
    pub fn is_well_formed(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A circular area: everything within `radius_m` meters of `center`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl GeoFence {
    pub const fn new(center: GeoPoint, radius_m: f64) -> Self {
        Self { center, radius_m }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_bounds() {
        assert!(GeoPoint::new(0.0, 0.0).is_well_formed());
        assert!(GeoPoint::new(90.0, -180.0).is_well_formed());
        assert!(!GeoPoint::new(90.1, 0.0).is_well_formed());
        assert!(!GeoPoint::new(0.0, 181.0).is_well_formed());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_well_formed());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_well_formed());
    }
}
