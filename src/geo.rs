//! Great-circle geometry between port coordinates.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for port-to-port distances, in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether latitude is within [-90, 90] and longitude within [-180, 180]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Distance to another coordinate in km (Haversine)
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(*self, *other)
    }
}

/// Haversine distance between two coordinates in km.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_york() -> Coordinate {
        Coordinate::new(40.7128, -74.0060)
    }

    fn los_angeles() -> Coordinate {
        Coordinate::new(34.0522, -118.2437)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance(new_york(), new_york()), 0.0);
        assert_eq!(distance(los_angeles(), los_angeles()), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (new_york(), los_angeles()),
            (Coordinate::new(51.9244, 4.4777), Coordinate::new(1.3521, 103.8198)),
            (Coordinate::new(-33.8688, 151.2093), Coordinate::new(64.1466, -21.9426)),
            (Coordinate::new(0.0, 179.9), Coordinate::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            let ab = distance(a, b);
            let ba = distance(b, a);
            assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{ab} vs {ba}");
        }
    }

    #[test]
    fn test_new_york_to_los_angeles() {
        // Roughly 3936 km along the great circle
        let d = new_york().distance_to(&los_angeles());
        assert!((d - 3935.75).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(new_york().is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.1).is_valid());
    }
}
