//! Route data module
//!
//! This module provides the immutable route data handed over by a directions
//! service: the geometry (an ordered list of points) and the maneuver steps
//! that reference ranges of that list.

use crate::{InvalidRoute, utils};
use geo::{BoundingRect, Coord, LineString, Point, Rect};
#[cfg(feature = "use-serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A WGS84 coordinate in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct RoutePoint {
    pub lon: f64,
    pub lat: f64,
}

impl RoutePoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether the coordinate is finite and inside WGS84 bounds
    #[inline]
    pub fn is_valid(&self) -> bool {
        utils::is_valid_wgs84(self.lon, self.lat)
    }
}

impl From<Point<f64>> for RoutePoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

impl From<RoutePoint> for Point<f64> {
    fn from(point: RoutePoint) -> Self {
        Point::new(point.lon, point.lat)
    }
}

impl From<RoutePoint> for Coord<f64> {
    fn from(point: RoutePoint) -> Self {
        Coord {
            x: point.lon,
            y: point.lat,
        }
    }
}

impl From<[f64; 2]> for RoutePoint {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self::new(lon, lat)
    }
}

/// Ordered, validated route geometry with precomputed metadata
///
/// A geometry always holds at least one point. Point indices are meaningful:
/// maneuver steps refer to them.
#[derive(Clone, Debug)]
pub struct RouteGeometry {
    /// The points as a geo line string (x = lon, y = lat)
    line: LineString<f64>,
    /// Cached bounding box in degrees
    bounding_box: Rect<f64>,
    /// Cached total length in meters (haversine)
    cached_total_distance: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteGeometry {
    /// Create a geometry from an ordered list of points
    ///
    /// # Errors
    /// [`InvalidRoute::EmptyGeometry`] for an empty list, [`InvalidRoute::Malformed`]
    /// for the first point that is not a finite WGS84 coordinate.
    pub fn new(points: impl IntoIterator<Item = RoutePoint>) -> Result<Self, InvalidRoute> {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        for (index, point) in points.into_iter().enumerate() {
            if !point.is_valid() {
                return Err(InvalidRoute::Malformed {
                    index,
                    reason: format!("({}, {}) is not a WGS84 coordinate", point.lon, point.lat),
                });
            }
            coords.push(point.into());
        }

        if coords.is_empty() {
            return Err(InvalidRoute::EmptyGeometry);
        }

        let line = LineString::new(coords);
        let bounding_box = line
            .bounding_rect()
            .ok_or(InvalidRoute::EmptyGeometry)?;
        let cached_total_distance = line
            .points()
            .zip(line.points().skip(1))
            .map(|(a, b)| utils::haversine_distance(a, b))
            .sum();

        Ok(Self {
            line,
            bounding_box,
            cached_total_distance,
        })
    }

    /// Number of points (always at least one)
    #[inline]
    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }

    /// Point at `index`, if in range
    #[inline]
    pub fn get(&self, index: usize) -> Option<RoutePoint> {
        self.line.0.get(index).map(|c| RoutePoint::new(c.x, c.y))
    }

    #[inline]
    pub fn first(&self) -> RoutePoint {
        let c = self.line.0[0];
        RoutePoint::new(c.x, c.y)
    }

    #[inline]
    pub fn last(&self) -> RoutePoint {
        let c = self.line.0[self.line.0.len() - 1];
        RoutePoint::new(c.x, c.y)
    }

    /// Iterate over all points in order
    pub fn points(&self) -> impl Iterator<Item = RoutePoint> + '_ {
        self.line.0.iter().map(|c| RoutePoint::new(c.x, c.y))
    }

    /// The underlying line string (x = lon, y = lat)
    #[inline]
    pub fn line_string(&self) -> &LineString<f64> {
        &self.line
    }

    /// Bounding box in degrees
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Total length in meters
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.cached_total_distance
    }
}

/// One instruction-bearing segment of a route
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct ManeuverStep {
    /// Human readable instruction ("Turn right onto ...")
    pub instruction: String,
    /// Length of the maneuver in meters
    pub distance_meters: f64,
    /// Inclusive `[start, end]` point indices into the geometry
    pub point_range: [usize; 2],
}

impl ManeuverStep {
    pub fn new(
        instruction: impl Into<String>,
        distance_meters: f64,
        point_range: [usize; 2],
    ) -> Self {
        Self {
            instruction: instruction.into(),
            distance_meters,
            point_range,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.point_range[0]
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.point_range[1]
    }

    /// Whether `index` lies in the inclusive point range
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.start() <= index && index <= self.end()
    }
}

/// A calculated route: geometry, steps and the provider's summary
#[derive(Clone, Debug)]
pub struct PlannedRoute {
    pub geometry: Arc<RouteGeometry>,
    pub steps: Arc<[ManeuverStep]>,
    /// Route length reported by the provider (or computed), in meters
    pub distance_meters: f64,
    /// Travel time reported by the provider, if any
    pub duration_seconds: Option<f64>,
}

impl PlannedRoute {
    pub fn new(geometry: RouteGeometry, steps: Vec<ManeuverStep>) -> Self {
        let distance_meters = geometry.total_distance();
        Self {
            geometry: Arc::new(geometry),
            steps: steps.into(),
            distance_meters,
            duration_seconds: None,
        }
    }
}
