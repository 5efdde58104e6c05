//! Route providers
//!
//! A [`RouteProvider`] turns an origin/destination pair into a [`PlannedRoute`].
//! The transport is up to the implementation; this module ships two file-backed
//! providers and the parser for OpenRouteService-style directions GeoJSON so
//! any HTTP client can reuse it.

use crate::{InvalidRoute, ManeuverStep, PlannedRoute, RouteError, RouteGeometry, RoutePoint, utils};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of calculated routes
pub trait RouteProvider {
    /// Calculate a route between two `"lon,lat"` coordinate strings
    fn route(&self, origin: &str, destination: &str) -> Result<PlannedRoute, RouteError>;
}

// --- Directions GeoJSON ---------------------------------------------------

#[derive(Deserialize)]
struct DirectionsDocument {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Deserialize)]
struct DirectionsFeature {
    geometry: LineGeometry,
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Deserialize)]
struct LineGeometry {
    #[serde(rename = "type")]
    kind: String,
    /// Shape depends on `kind`; only read once it is known to be a line
    #[serde(default)]
    coordinates: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct FeatureProperties {
    #[serde(default)]
    segments: Vec<DirectionsSegment>,
    summary: Option<DirectionsSummary>,
}

#[derive(Deserialize)]
struct DirectionsSegment {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Deserialize)]
struct DirectionsStep {
    instruction: String,
    #[serde(default)]
    distance: f64,
    way_points: [usize; 2],
}

#[derive(Deserialize)]
struct DirectionsSummary {
    #[serde(default)]
    distance: f64,
    duration: Option<f64>,
}

/// Parse a directions GeoJSON response into a planned route
///
/// Reads the first feature: its `LineString` coordinates (`[lon, lat]` or
/// `[lon, lat, elevation]`) become the geometry, and the steps of all its
/// segments, concatenated in order, become the maneuvers.
pub fn parse_directions(json: &str) -> Result<PlannedRoute, RouteError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("directions::parse");

    let document: DirectionsDocument = serde_json::from_str(json)?;
    let feature = document
        .features
        .into_iter()
        .next()
        .ok_or(RouteError::MissingRoute)?;

    if feature.geometry.kind != "LineString" {
        return Err(RouteError::UnsupportedGeometry(feature.geometry.kind));
    }

    let coordinates: Vec<Vec<f64>> = match feature.geometry.coordinates {
        serde_json::Value::Null => Vec::new(),
        value => serde_json::from_value(value)?,
    };
    let mut points = Vec::with_capacity(coordinates.len());
    for (index, coordinate) in coordinates.iter().enumerate() {
        match coordinate.as_slice() {
            [lon, lat, ..] => points.push(RoutePoint::new(*lon, *lat)),
            _ => {
                return Err(InvalidRoute::Malformed {
                    index,
                    reason: format!("expected [lon, lat], got {} value(s)", coordinate.len()),
                }
                .into());
            }
        }
    }
    let geometry = RouteGeometry::new(points)?;

    let steps: Vec<ManeuverStep> = feature
        .properties
        .segments
        .into_iter()
        .flat_map(|segment| segment.steps)
        .map(|step| ManeuverStep::new(step.instruction, step.distance, step.way_points))
        .collect();

    tracing::debug!(
        "Parsed directions: {} points, {} steps",
        geometry.len(),
        steps.len()
    );

    let mut route = PlannedRoute::new(geometry, steps);
    if let Some(summary) = feature.properties.summary {
        if summary.distance > 0.0 {
            route.distance_meters = summary.distance;
        }
        route.duration_seconds = summary.duration;
    }
    Ok(route)
}

/// Replays a saved directions response regardless of the requested endpoints
#[derive(Clone, Debug)]
pub struct DirectionsFileProvider {
    path: PathBuf,
}

impl DirectionsFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RouteProvider for DirectionsFileProvider {
    fn route(&self, origin: &str, destination: &str) -> Result<PlannedRoute, RouteError> {
        tracing::info!(
            "Loading directions {} -> {} from {}",
            origin,
            destination,
            self.path.display()
        );
        let json = std::fs::read_to_string(&self.path)?;
        parse_directions(&json)
    }
}

// --- GPX tracks -----------------------------------------------------------

/// Uses the tracks of a GPX file as a route, one maneuver per track segment
#[derive(Clone, Debug)]
pub struct GpxTrackProvider {
    path: PathBuf,
}

impl GpxTrackProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Convert parsed GPX data into a planned route
    pub fn route_from_gpx(gpx_data: &gpx::Gpx) -> Result<PlannedRoute, RouteError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("gpx::route_from_gpx");

        let mut points: Vec<RoutePoint> = Vec::new();
        let mut steps: Vec<ManeuverStep> = Vec::new();

        for (track_index, track) in gpx_data.tracks.iter().enumerate() {
            let label = match &track.name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => format!("track {}", track_index + 1),
            };

            for segment in &track.segments {
                if segment.points.is_empty() {
                    continue;
                }

                let start = points.len();
                let mut distance = 0.0;
                let mut prev: Option<geo::Point<f64>> = None;
                for waypoint in &segment.points {
                    let point = waypoint.point();
                    if let Some(prev) = prev {
                        distance += utils::haversine_distance(prev, point);
                    }
                    prev = Some(point);
                    points.push(point.into());
                }

                steps.push(ManeuverStep::new(
                    format!("Follow {label}"),
                    distance,
                    [start, points.len() - 1],
                ));
            }
        }

        let geometry = RouteGeometry::new(points)?;
        Ok(PlannedRoute::new(geometry, steps))
    }
}

impl RouteProvider for GpxTrackProvider {
    fn route(&self, origin: &str, destination: &str) -> Result<PlannedRoute, RouteError> {
        tracing::info!(
            "Loading GPX track {} -> {} from {}",
            origin,
            destination,
            self.path.display()
        );
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        let gpx_data = gpx::read(reader)?;
        Self::route_from_gpx(&gpx_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpx::{Gpx, Track, TrackSegment, Waypoint};

    const DIRECTIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[-75.5743, 6.2442], [-75.5740, 6.2450, 1480.0], [-75.5580, 6.2480]]
            },
            "properties": {
                "segments": [
                    {"distance": 900.0, "duration": 120.0, "steps": [
                        {"distance": 42.0, "duration": 10.0, "type": 11, "instruction": "Head north", "name": "Calle 50", "way_points": [0, 1]}
                    ]},
                    {"steps": [
                        {"distance": 0.0, "duration": 0.0, "type": 10, "instruction": "Arrive at your destination", "way_points": [2, 2]}
                    ]}
                ],
                "summary": {"distance": 1890.4, "duration": 300.5}
            }
        }]
    }"#;

    #[test]
    fn test_parse_directions() {
        let route = parse_directions(DIRECTIONS).unwrap();

        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.geometry.get(1), Some(RoutePoint::new(-75.5740, 6.2450)));
        assert_eq!(
            route.steps.to_vec(),
            vec![
                ManeuverStep::new("Head north", 42.0, [0, 1]),
                ManeuverStep::new("Arrive at your destination", 0.0, [2, 2]),
            ]
        );
        assert_eq!(route.distance_meters, 1890.4);
        assert_eq!(route.duration_seconds, Some(300.5));
    }

    #[test]
    fn test_parse_directions_without_features() {
        let result = parse_directions(r#"{"type": "FeatureCollection", "features": []}"#);
        assert!(matches!(result, Err(RouteError::MissingRoute)));
    }

    #[test]
    fn test_parse_directions_rejects_points() {
        let json = r#"{"features": [{"geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}]}"#;
        let result = parse_directions(json);
        assert!(matches!(result, Err(RouteError::UnsupportedGeometry(kind)) if kind == "Point"));

        let json = r#"{"features": [{"geometry": {"type": "MultiLineString", "coordinates": [[[1.0, 2.0], [3.0, 4.0]]]}}]}"#;
        let result = parse_directions(json);
        let Err(RouteError::UnsupportedGeometry(kind)) = &result else {
            panic!("expected unsupported geometry, got {result:?}");
        };
        assert_eq!(kind, "MultiLineString");
    }

    #[test]
    fn test_parse_directions_line_with_bad_coordinates() {
        let json =
            r#"{"features": [{"geometry": {"type": "LineString", "coordinates": [1.0, 2.0]}}]}"#;
        assert!(matches!(parse_directions(json), Err(RouteError::Json(_))));
    }

    #[test]
    fn test_parse_directions_empty_line() {
        let json = r#"{"features": [{"geometry": {"type": "LineString", "coordinates": []}}]}"#;
        let result = parse_directions(json);
        assert!(matches!(
            result,
            Err(RouteError::InvalidRoute(InvalidRoute::EmptyGeometry))
        ));
    }

    #[test]
    fn test_parse_directions_short_coordinate() {
        let json =
            r#"{"features": [{"geometry": {"type": "LineString", "coordinates": [[1.0, 2.0], [3.0]]}}]}"#;
        let result = parse_directions(json);
        assert!(matches!(
            result,
            Err(RouteError::InvalidRoute(InvalidRoute::Malformed { index: 1, .. }))
        ));
    }

    #[test]
    fn test_parse_directions_invalid_json() {
        assert!(matches!(parse_directions("not json"), Err(RouteError::Json(_))));
    }

    #[test]
    fn test_summary_fallback_to_geometry_distance() {
        let json = r#"{"features": [{"geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [0.0, 0.001]]}}]}"#;
        let route = parse_directions(json).unwrap();

        assert!(route.steps.is_empty());
        assert!((route.distance_meters - route.geometry.total_distance()).abs() < f64::EPSILON);
        assert_eq!(route.duration_seconds, None);
    }

    fn waypoint(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(geo::Point::new(lon, lat))
    }

    fn create_test_gpx() -> Gpx {
        let mut gpx = Gpx::default();

        let mut named = Track::default();
        named.name = Some("Morning loop".to_string());
        let mut first = TrackSegment::default();
        first.points.push(waypoint(51.5074, -0.1278));
        first.points.push(waypoint(51.5076, -0.1276));
        let mut second = TrackSegment::default();
        second.points.push(waypoint(51.5078, -0.1274));
        named.segments.push(first);
        named.segments.push(TrackSegment::default());
        named.segments.push(second);
        gpx.tracks.push(named);

        let mut unnamed = Track::default();
        let mut segment = TrackSegment::default();
        segment.points.push(waypoint(51.5080, -0.1272));
        segment.points.push(waypoint(51.5082, -0.1270));
        unnamed.segments.push(segment);
        gpx.tracks.push(unnamed);

        gpx
    }

    #[test]
    fn test_route_from_gpx() {
        let route = GpxTrackProvider::route_from_gpx(&create_test_gpx()).unwrap();

        assert_eq!(route.geometry.len(), 5);
        let ranges: Vec<[usize; 2]> = route.steps.iter().map(|s| s.point_range).collect();
        assert_eq!(ranges, vec![[0, 1], [2, 2], [3, 4]]);
        assert_eq!(route.steps[0].instruction, "Follow Morning loop");
        assert_eq!(route.steps[2].instruction, "Follow track 2");
        assert!(route.steps[0].distance_meters > 0.0);
        assert_eq!(route.steps[1].distance_meters, 0.0);
    }

    #[test]
    fn test_route_from_empty_gpx() {
        let result = GpxTrackProvider::route_from_gpx(&Gpx::default());
        assert!(matches!(
            result,
            Err(RouteError::InvalidRoute(InvalidRoute::EmptyGeometry))
        ));
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "route-playback-lib-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_gpx_provider_reads_file() {
        let path = write_temp(
            "track.gpx",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Evening ride</name>
    <trkseg>
      <trkpt lat="6.2442" lon="-75.5743"></trkpt>
      <trkpt lat="6.2450" lon="-75.5740"></trkpt>
      <trkpt lat="6.2480" lon="-75.5580"></trkpt>
    </trkseg>
  </trk>
</gpx>"#,
        );

        let route = GpxTrackProvider::new(&path).route("0,0", "1,1").unwrap();

        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.geometry.first(), RoutePoint::new(-75.5743, 6.2442));
        assert_eq!(route.steps.len(), 1);
        assert_eq!(route.steps[0].instruction, "Follow Evening ride");
        assert_eq!(route.steps[0].point_range, [0, 2]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_gpx_provider_rejects_garbage() {
        let path = write_temp("garbage.gpx", "not xml at all");
        let result = GpxTrackProvider::new(&path).route("0,0", "1,1");
        assert!(matches!(result, Err(RouteError::Gpx(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_directions_file_provider_reads_file() {
        let path = write_temp("directions.json", DIRECTIONS);
        let provider = DirectionsFileProvider::new(&path);

        let route = provider.route("0,0", "1,1").unwrap();

        assert_eq!(provider.path(), path.as_path());
        assert_eq!(route.steps.len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_file_provider_missing_file() {
        let provider = DirectionsFileProvider::new("/nonexistent/route.json");
        let result = provider.route("0,0", "1,1");
        assert!(matches!(result, Err(RouteError::Io(_))));
    }
}
