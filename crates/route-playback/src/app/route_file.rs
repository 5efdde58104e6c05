//! Route files as a [`RouteProvider`]
//!
//! The CLI has no routing service: it reads one saved route up front, places
//! the delivery endpoints from it, then hands the same route back when the
//! planner asks for it.

use crate::AppError;
use route_playback_lib::{
    GpxTrackProvider, PlannedRoute, RouteError, RouteProvider, parse_directions,
};
use std::path::Path;

/// Supported route file formats, chosen by extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteFormat {
    /// Directions GeoJSON (`.json`, `.geojson`)
    Directions,
    /// GPX tracks (`.gpx`)
    Gpx,
}

impl RouteFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json" | "geojson") => Ok(Self::Directions),
            Some("gpx") => Ok(Self::Gpx),
            _ => Err(AppError::UnsupportedFile(path.to_path_buf())),
        }
    }
}

/// A route loaded from disk
#[derive(Clone, Debug)]
pub struct RouteFile {
    route: PlannedRoute,
}

impl RouteFile {
    /// Read and parse the route at `path`
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let format = RouteFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let route = Self::parse(format, &bytes)?;
        tracing::info!(
            "Loaded {:?} route from {}: {} points, {} steps",
            format,
            path.display(),
            route.route.geometry.len(),
            route.route.steps.len()
        );
        Ok(route)
    }

    pub fn parse(format: RouteFormat, bytes: &[u8]) -> Result<Self, RouteError> {
        let route = match format {
            RouteFormat::Directions => {
                let json = std::str::from_utf8(bytes).map_err(|e| {
                    RouteError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                })?;
                parse_directions(json)?
            }
            RouteFormat::Gpx => GpxTrackProvider::route_from_gpx(&gpx::read(bytes)?)?,
        };
        Ok(Self { route })
    }

    pub fn planned_route(&self) -> &PlannedRoute {
        &self.route
    }
}

impl RouteProvider for RouteFile {
    fn route(&self, origin: &str, destination: &str) -> Result<PlannedRoute, RouteError> {
        tracing::debug!("Serving saved route for {} -> {}", origin, destination);
        Ok(self.route.clone())
    }
}
