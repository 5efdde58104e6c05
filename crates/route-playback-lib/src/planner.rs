//! Delivery planner: origin/destination placement and route calculation
//!
//! The first placed point becomes the delivery origin, the second the
//! destination. Once both exist the route can be calculated and drawn; clearing
//! removes everything the planner put on the map. The planner never touches the
//! vehicle marker, which belongs to playback.

use crate::{
    AddressSuggestion, CameraCommand, MapView, MarkerId, MarkerSpec, PlannedRoute, PlannerError,
    RouteProvider, RoutePoint, utils,
};
#[cfg(feature = "use-serde")]
use serde::{Deserialize, Serialize};

/// Name of the line layer holding the calculated route
pub const ROUTE_LAYER: &str = "route";

/// Planner camera and marker settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct PlannerConfig {
    pub origin_marker: MarkerSpec,
    pub destination_marker: MarkerSpec,
    /// Overview shown by `reset_view`
    pub overview: CameraCommand,
    /// Zoom used by `focus`
    pub focus_zoom: f64,
    /// Zoom used after a route is calculated
    pub route_zoom: f64,
    pub fly_speed: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            origin_marker: MarkerSpec::new("red").with_label("Delivery origin"),
            destination_marker: MarkerSpec::new("blue").with_label("Delivery destination"),
            overview: CameraCommand::new(RoutePoint::new(-60.0, -10.0), 3.0, 1.5),
            focus_zoom: 12.0,
            route_zoom: 15.0,
            fly_speed: 1.5,
        }
    }
}

/// What a call to `place` did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Origin,
    Destination,
    /// Both endpoints were already placed
    Ignored,
}

#[derive(Clone, Debug)]
struct Endpoint {
    point: RoutePoint,
    label: Option<String>,
}

/// Places delivery endpoints and calculates the route between them
pub struct DeliveryPlanner<M> {
    map: M,
    config: PlannerConfig,
    origin: Option<Endpoint>,
    destination: Option<Endpoint>,
    route: Option<PlannedRoute>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<M: MapView> DeliveryPlanner<M> {
    pub fn new(map: M, config: PlannerConfig) -> Self {
        Self {
            map,
            config,
            origin: None,
            destination: None,
            route: None,
        }
    }

    /// Place the next endpoint at `point` (e.g. a map click)
    pub fn place(&mut self, point: RoutePoint) -> Result<Placement, PlannerError> {
        self.place_labeled(point, None)
    }

    /// Place the next endpoint at a chosen autocomplete suggestion
    pub fn select_suggestion(
        &mut self,
        suggestion: &AddressSuggestion,
    ) -> Result<Placement, PlannerError> {
        self.place_labeled(suggestion.point, Some(suggestion.name.clone()))
    }

    /// React to a fresh autocomplete result list
    ///
    /// An empty list means the typed address cannot be resolved, so both
    /// markers and the route are cleared. Non-empty lists change nothing until
    /// one entry is selected.
    pub fn apply_suggestions(
        &mut self,
        suggestions: &[AddressSuggestion],
    ) -> Result<(), PlannerError> {
        if suggestions.is_empty() {
            tracing::debug!("No address suggestions; clearing delivery endpoints");
            self.clear()?;
        }
        Ok(())
    }

    fn place_labeled(
        &mut self,
        point: RoutePoint,
        label: Option<String>,
    ) -> Result<Placement, PlannerError> {
        let (id, spec, placement) = if self.origin.is_none() {
            (MarkerId::ORIGIN, &self.config.origin_marker, Placement::Origin)
        } else if self.destination.is_none() {
            (
                MarkerId::DESTINATION,
                &self.config.destination_marker,
                Placement::Destination,
            )
        } else {
            tracing::debug!("Both endpoints placed; ignoring {:?}", point);
            return Ok(Placement::Ignored);
        };

        self.map.place_marker(id, spec, point)?;
        tracing::info!(
            "Placed delivery {:?} at {}",
            placement,
            utils::format_coordinate(point.into())
        );

        let endpoint = Some(Endpoint { point, label });
        match placement {
            Placement::Origin => self.origin = endpoint,
            Placement::Destination => self.destination = endpoint,
            Placement::Ignored => {}
        }
        Ok(placement)
    }

    /// Whether both endpoints are placed
    pub fn is_ready(&self) -> bool {
        self.origin.is_some() && self.destination.is_some()
    }

    /// Which endpoint the next text input or click fills, if any
    pub fn next_slot(&self) -> Option<Placement> {
        if self.origin.is_none() {
            Some(Placement::Origin)
        } else if self.destination.is_none() {
            Some(Placement::Destination)
        } else {
            None
        }
    }

    pub fn origin(&self) -> Option<RoutePoint> {
        self.origin.as_ref().map(|e| e.point)
    }

    pub fn destination(&self) -> Option<RoutePoint> {
        self.destination.as_ref().map(|e| e.point)
    }

    /// Text shown in the origin input (the chosen suggestion's name)
    pub fn origin_label(&self) -> Option<&str> {
        self.origin.as_ref().and_then(|e| e.label.as_deref())
    }

    pub fn destination_label(&self) -> Option<&str> {
        self.destination.as_ref().and_then(|e| e.label.as_deref())
    }

    /// The last calculated route
    pub fn route(&self) -> Option<&PlannedRoute> {
        self.route.as_ref()
    }

    /// Ask `provider` for the route between the endpoints, draw it and fly to the origin
    ///
    /// On provider failure the map and the previous route are left untouched.
    /// Once the provider succeeds the previous route is dropped, so a failing
    /// map call leaves no route behind.
    pub fn calculate_route<P>(&mut self, provider: &P) -> Result<&PlannedRoute, PlannerError>
    where
        P: RouteProvider + ?Sized,
    {
        let (Some(origin), Some(destination)) = (self.origin(), self.destination()) else {
            return Err(PlannerError::MissingEndpoints);
        };

        let route = provider.route(
            &utils::format_coordinate(origin.into()),
            &utils::format_coordinate(destination.into()),
        )?;
        tracing::info!(
            "Route calculated: {} points, {} steps, {:.0} m",
            route.geometry.len(),
            route.steps.len(),
            route.distance_meters
        );

        self.route = None;
        if self.map.has_layer(ROUTE_LAYER) {
            self.map.remove_layer(ROUTE_LAYER)?;
        }
        self.map.add_line_layer(ROUTE_LAYER, &route.geometry)?;
        self.map.fly_to(CameraCommand::new(
            origin,
            self.config.route_zoom,
            self.config.fly_speed,
        ))?;

        Ok(&*self.route.insert(route))
    }

    /// Remove both endpoint markers and the route layer
    pub fn clear(&mut self) -> Result<(), PlannerError> {
        if self.origin.take().is_some() {
            self.map.remove_marker(MarkerId::ORIGIN)?;
        }
        if self.destination.take().is_some() {
            self.map.remove_marker(MarkerId::DESTINATION)?;
        }
        if self.map.has_layer(ROUTE_LAYER) {
            self.map.remove_layer(ROUTE_LAYER)?;
        }
        self.route = None;
        tracing::debug!("Delivery planner cleared");
        Ok(())
    }

    /// Fly back to the configured overview
    pub fn reset_view(&mut self) -> Result<(), PlannerError> {
        self.map.fly_to(self.config.overview)?;
        Ok(())
    }

    /// Fly to `point` at the focus zoom (e.g. a searched city)
    pub fn focus(&mut self, point: RoutePoint) -> Result<(), PlannerError> {
        self.map.fly_to(CameraCommand::new(
            point,
            self.config.focus_zoom,
            self.config.fly_speed,
        ))?;
        Ok(())
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }
}
