//! Console side-effect sinks
//!
//! Stand-ins for a real map widget and text-to-speech engine. They keep just
//! enough state to answer queries (`has_layer`, marker positions) and log every
//! effect through `tracing`, so a playback can be followed from the terminal.

use route_playback_lib::{
    CameraCommand, MapView, MarkerId, MarkerSpec, RouteGeometry, RoutePoint, SideEffectError,
    SpeechOutput, Utterance, utils,
};
use std::collections::{HashMap, HashSet};

/// Map view that logs markers, layers and camera moves
#[derive(Debug, Default)]
pub struct ConsoleMapView {
    markers: HashMap<MarkerId, RoutePoint>,
    layers: HashSet<String>,
    camera: Option<CameraCommand>,
}

impl ConsoleMapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position of a marker, if it is on the map
    pub fn marker(&self, id: MarkerId) -> Option<RoutePoint> {
        self.markers.get(&id).copied()
    }

    /// Last camera command received
    pub fn camera(&self) -> Option<CameraCommand> {
        self.camera
    }
}

fn fmt_point(point: RoutePoint) -> String {
    utils::format_coordinate(point.into())
}

impl MapView for ConsoleMapView {
    fn place_marker(
        &mut self,
        id: MarkerId,
        spec: &MarkerSpec,
        at: RoutePoint,
    ) -> Result<(), SideEffectError> {
        if !at.is_valid() {
            return Err(SideEffectError::Rejected(format!(
                "marker {} outside WGS84 bounds",
                id.0
            )));
        }
        self.markers.insert(id, at);
        tracing::info!(
            "[map] marker {} ({}{}) at {}",
            id.0,
            spec.color,
            spec.label
                .as_deref()
                .map(|label| format!(", {label:?}"))
                .unwrap_or_default(),
            fmt_point(at)
        );
        Ok(())
    }

    fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError> {
        let Some(position) = self.markers.get_mut(&id) else {
            return Err(SideEffectError::Rejected(format!(
                "marker {} is not on the map",
                id.0
            )));
        };
        *position = at;
        tracing::debug!("[map] marker {} -> {}", id.0, fmt_point(at));
        Ok(())
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError> {
        if self.markers.remove(&id).is_none() {
            return Err(SideEffectError::Rejected(format!(
                "marker {} is not on the map",
                id.0
            )));
        }
        tracing::info!("[map] marker {} removed", id.0);
        Ok(())
    }

    fn add_line_layer(
        &mut self,
        name: &str,
        geometry: &RouteGeometry,
    ) -> Result<(), SideEffectError> {
        if !self.layers.insert(name.to_string()) {
            return Err(SideEffectError::Rejected(format!("layer {name} already exists")));
        }
        let bbox = geometry.bounding_box();
        tracing::info!(
            "[map] layer {} added: {} points, {:.0} m, bbox ({:.5},{:.5})..({:.5},{:.5})",
            name,
            geometry.len(),
            geometry.total_distance(),
            bbox.min().x,
            bbox.min().y,
            bbox.max().x,
            bbox.max().y
        );
        Ok(())
    }

    fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError> {
        if !self.layers.remove(name) {
            return Err(SideEffectError::Rejected(format!("layer {name} does not exist")));
        }
        tracing::info!("[map] layer {} removed", name);
        Ok(())
    }

    fn has_layer(&self, name: &str) -> bool {
        self.layers.contains(name)
    }

    fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError> {
        tracing::debug!(
            "[camera] {} zoom {} speed {} bearing {:?} pitch {:?}",
            fmt_point(camera.center),
            camera.zoom,
            camera.speed,
            camera.bearing,
            camera.pitch
        );
        self.camera = Some(camera);
        Ok(())
    }
}

/// Speech output that logs each utterance instead of voicing it
#[derive(Debug, Default)]
pub struct ConsoleSpeech {
    spoken: Vec<String>,
}

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every utterance queued so far
    pub fn spoken(&self) -> &[String] {
        &self.spoken
    }
}

impl SpeechOutput for ConsoleSpeech {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError> {
        tracing::info!("[voice {}] {}", utterance.locale, utterance.text);
        self.spoken.push(utterance.text);
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), SideEffectError> {
        tracing::debug!("[voice] cancelled");
        Ok(())
    }
}
