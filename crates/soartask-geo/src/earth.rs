/*
[INPUT]:  Latitude/longitude pairs in degrees, distances in metres
[OUTPUT]: Great-circle distance, initial bearing and destination points
[POS]:    Geometry layer - spherical earth primitives (pure functions)
[UPDATE]: When a different earth model or new projections are needed
*/

use serde::{Deserialize, Serialize};

use crate::angle::angle_limit_360;

/// FAI sphere radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position on the sphere, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Distance in metres and initial bearing in degrees (0-360) from `from` to `to`.
pub fn distance_bearing(from: GeoPoint, to: GeoPoint) -> (f64, f64) {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    let distance = EARTH_RADIUS_M * c;

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    let bearing = angle_limit_360(y.atan2(x).to_degrees());

    (distance, bearing)
}

pub fn distance(from: GeoPoint, to: GeoPoint) -> f64 {
    distance_bearing(from, to).0
}

/// Distance of the dog-leg `p1 -> p2 -> p3`.
pub fn double_distance(p1: GeoPoint, p2: GeoPoint, p3: GeoPoint) -> f64 {
    distance(p1, p2) + distance(p2, p3)
}

/// Point reached by travelling `distance` metres from `origin` along `bearing`.
pub fn destination(origin: GeoPoint, bearing: f64, distance: f64) -> GeoPoint {
    if distance == 0.0 {
        return origin;
    }

    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let theta = bearing.to_radians();
    let delta = distance / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    let longitude = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    GeoPoint::new(lat2.to_degrees(), longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn one_degree_of_latitude() {
        let (d, b) = distance_bearing(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_194.9).abs() < 1.0, "distance {d}");
        assert!(b.abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0)]
    #[case(45.0)]
    #[case(135.0)]
    #[case(270.0)]
    fn destination_inverts_distance_bearing(#[case] bearing: f64) {
        let origin = GeoPoint::new(47.25, 11.4);
        let target = destination(origin, bearing, 25_000.0);
        let (d, b) = distance_bearing(origin, target);
        assert!((d - 25_000.0).abs() < 0.01, "distance {d}");
        assert!((b - bearing).abs() < 1e-6, "bearing {b}");
    }

    #[test]
    fn zero_distance_is_identity() {
        let origin = GeoPoint::new(-33.9, 151.2);
        assert_eq!(destination(origin, 123.0, 0.0), origin);
    }

    #[test]
    fn double_distance_sums_both_legs() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let c = GeoPoint::new(1.0, 1.0);
        let total = double_distance(a, b, c);
        assert!((total - (distance(a, b) + distance(b, c))).abs() < 1e-9);
    }
}
