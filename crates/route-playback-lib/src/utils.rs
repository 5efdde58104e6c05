//! Utility functions for geodesic math and coordinate strings

use geo::Point;

/// Earth's mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6371000.0;

/// Maximum absolute longitude in degrees
pub const MAX_LONGITUDE: f64 = 180.0;

/// Maximum absolute latitude in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Calculate the Haversine distance between two WGS84 points in meters
///
/// Points use x = longitude, y = latitude (degrees).
#[inline]
pub fn haversine_distance(p1: Point<f64>, p2: Point<f64>) -> f64 {
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let delta_lat = (p2.y() - p1.y()).to_radians();
    let delta_lon = (p2.x() - p1.x()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` to `to`, in degrees clockwise from north
///
/// # Returns
/// A value in `[0, 360)`. Identical points yield `0.0`.
#[inline]
pub fn initial_bearing(from: Point<f64>, to: Point<f64>) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let delta_lon = (to.x() - from.x()).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Check if a longitude/latitude pair is a usable WGS84 coordinate
#[inline(always)]
pub fn is_valid_wgs84(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon)
        && (-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat)
}

/// Format a point as the `"lon,lat"` string directions services expect
pub fn format_coordinate(point: Point<f64>) -> String {
    format!("{},{}", point.x(), point.y())
}

/// Parse a `"lon,lat"` string back into a point
///
/// Whitespace around either component is ignored. Returns `None` for anything
/// that is not two finite numbers inside WGS84 bounds.
pub fn parse_coordinate(text: &str) -> Option<Point<f64>> {
    let (lon, lat) = text.split_once(',')?;
    let lon: f64 = lon.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    is_valid_wgs84(lon, lat).then(|| Point::new(lon, lat))
}
