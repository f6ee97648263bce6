//! Geographic coordinate value type and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 coordinate in decimal degrees.
///
/// Immutable value type. Inputs are unrestricted: out-of-range degree
/// values are accepted and simply produce a garbage distance, since
/// upstream position sources are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from decimal degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// Pure, deterministic, and symmetric within floating-point tolerance.
#[must_use]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(40.4167, -3.7038);
        assert!(distance_meters(p, p).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(40.0, -3.0);
        let b = Coordinate::new(41.0, -2.0);
        let ab = distance_meters(a, b);
        let ba = distance_meters(b, a);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = Coordinate::new(40.0, -3.0);
        let b = Coordinate::new(41.0, -3.0);
        let d = distance_meters(a, b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn hundredth_of_a_degree_is_about_1_1_km() {
        // Same sample the proximity engine's falling-edge scenario uses.
        let a = Coordinate::new(40.0, -3.0);
        let b = Coordinate::new(40.01, -3.0);
        let d = distance_meters(a, b);
        assert!(d > 1_000.0 && d < 1_200.0, "got {d}");
    }

    #[test]
    fn garbage_input_does_not_panic() {
        let a = Coordinate::new(f64::NAN, 720.0);
        let b = Coordinate::new(-500.0, f64::INFINITY);
        // Non-fatal garbage out, per the trusted-input contract.
        let _ = distance_meters(a, b);
    }
}
