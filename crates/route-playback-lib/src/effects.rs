//! Side-effect sinks: the map view and the speech output
//!
//! Both are implemented by the host UI. Every call is fire-and-forget: nothing
//! here waits for a camera flight or an utterance to finish.
//!
//! Shared handles are supported through blanket implementations:
//! - `Arc<Mutex<T>>` lets the sequencer and the surrounding UI drive one view.
//! - `Weak<Mutex<T>>` reports [`SideEffectError::Unavailable`] once the view is gone.

use crate::{RouteGeometry, RoutePoint, SideEffectError};
#[cfg(feature = "use-serde")]
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Identifier of a point marker on the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerId(pub &'static str);

impl MarkerId {
    /// The marker animated by playback
    pub const VEHICLE: MarkerId = MarkerId("vehicle");
    /// Delivery origin placed by the planner
    pub const ORIGIN: MarkerId = MarkerId("origin");
    /// Delivery destination placed by the planner
    pub const DESTINATION: MarkerId = MarkerId("destination");
}

/// Appearance of a marker
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct MarkerSpec {
    /// CSS-style color name or hex string
    pub color: String,
    /// Popup text, if any
    pub label: Option<String>,
}

impl MarkerSpec {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Camera fly-to parameters
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct CameraCommand {
    pub center: RoutePoint,
    pub zoom: f64,
    /// Flight speed multiplier (1.0 = default)
    pub speed: f64,
    /// Degrees clockwise from north; `None` keeps the current bearing
    pub bearing: Option<f64>,
    /// Degrees from nadir; `None` keeps the current pitch
    pub pitch: Option<f64>,
}

impl CameraCommand {
    pub fn new(center: RoutePoint, zoom: f64, speed: f64) -> Self {
        Self {
            center,
            zoom,
            speed,
            bearing: None,
            pitch: None,
        }
    }
}

/// Text handed to the speech output
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct Utterance {
    pub text: String,
    /// BCP 47 language tag, e.g. `en-US`
    pub locale: String,
    /// 0.5 to 2.0, 1.0 is normal speed
    pub rate: f32,
    /// 0.0 to 2.0, 1.0 is normal pitch
    pub pitch: f32,
}

/// Map view commands consumed by playback and the planner
pub trait MapView {
    /// Add a marker, replacing any marker with the same id
    fn place_marker(
        &mut self,
        id: MarkerId,
        spec: &MarkerSpec,
        at: RoutePoint,
    ) -> Result<(), SideEffectError>;

    fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError>;

    /// Remove a marker (no-op if it does not exist)
    fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError>;

    /// Draw a named line layer following `geometry`
    fn add_line_layer(&mut self, name: &str, geometry: &RouteGeometry)
    -> Result<(), SideEffectError>;

    /// Remove a named layer and its source (no-op if it does not exist)
    fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError>;

    fn has_layer(&self, name: &str) -> bool;

    fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError>;
}

/// Asynchronous text-to-speech sink
pub trait SpeechOutput {
    /// Queue an utterance; returns without waiting for it to be spoken
    fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError>;

    /// Drop the queued and in-flight utterances
    fn cancel_all(&mut self) -> Result<(), SideEffectError>;
}

fn lock<'a, T: ?Sized>(
    mutex: &'a Mutex<T>,
    what: &str,
) -> Result<MutexGuard<'a, T>, SideEffectError> {
    mutex
        .lock()
        .map_err(|_| SideEffectError::Unavailable(format!("{what} lock poisoned")))
}

fn upgrade<T: ?Sized>(weak: &Weak<Mutex<T>>, what: &str) -> Result<Arc<Mutex<T>>, SideEffectError> {
    weak.upgrade()
        .ok_or_else(|| SideEffectError::Unavailable(format!("{what} was torn down")))
}

impl<T: MapView + ?Sized> MapView for Box<T> {
    fn place_marker(
        &mut self,
        id: MarkerId,
        spec: &MarkerSpec,
        at: RoutePoint,
    ) -> Result<(), SideEffectError> {
        (**self).place_marker(id, spec, at)
    }

    fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError> {
        (**self).move_marker(id, at)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError> {
        (**self).remove_marker(id)
    }

    fn add_line_layer(
        &mut self,
        name: &str,
        geometry: &RouteGeometry,
    ) -> Result<(), SideEffectError> {
        (**self).add_line_layer(name, geometry)
    }

    fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError> {
        (**self).remove_layer(name)
    }

    fn has_layer(&self, name: &str) -> bool {
        (**self).has_layer(name)
    }

    fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError> {
        (**self).fly_to(camera)
    }
}

impl<T: MapView + ?Sized> MapView for Arc<Mutex<T>> {
    fn place_marker(
        &mut self,
        id: MarkerId,
        spec: &MarkerSpec,
        at: RoutePoint,
    ) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.place_marker(id, spec, at)
    }

    fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.move_marker(id, at)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.remove_marker(id)
    }

    fn add_line_layer(
        &mut self,
        name: &str,
        geometry: &RouteGeometry,
    ) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.add_line_layer(name, geometry)
    }

    fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.remove_layer(name)
    }

    fn has_layer(&self, name: &str) -> bool {
        lock(&**self, "map view")
            .map(|view| view.has_layer(name))
            .unwrap_or(false)
    }

    fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError> {
        lock(&**self, "map view")?.fly_to(camera)
    }
}

impl<T: MapView + ?Sized> MapView for Weak<Mutex<T>> {
    fn place_marker(
        &mut self,
        id: MarkerId,
        spec: &MarkerSpec,
        at: RoutePoint,
    ) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.place_marker(id, spec, at)
    }

    fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.move_marker(id, at)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.remove_marker(id)
    }

    fn add_line_layer(
        &mut self,
        name: &str,
        geometry: &RouteGeometry,
    ) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.add_line_layer(name, geometry)
    }

    fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.remove_layer(name)
    }

    fn has_layer(&self, name: &str) -> bool {
        upgrade(&*self, "map view")
            .map(|view| view.has_layer(name))
            .unwrap_or(false)
    }

    fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError> {
        upgrade(&*self, "map view")?.fly_to(camera)
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Box<T> {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError> {
        (**self).speak(utterance)
    }

    fn cancel_all(&mut self) -> Result<(), SideEffectError> {
        (**self).cancel_all()
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Arc<Mutex<T>> {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError> {
        lock(&**self, "speech output")?.speak(utterance)
    }

    fn cancel_all(&mut self) -> Result<(), SideEffectError> {
        lock(&**self, "speech output")?.cancel_all()
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Weak<Mutex<T>> {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError> {
        upgrade(&*self, "speech output")?.speak(utterance)
    }

    fn cancel_all(&mut self) -> Result<(), SideEffectError> {
        upgrade(&*self, "speech output")?.cancel_all()
    }
}

/// Recording fakes shared by the unit tests of this crate
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// One observed side effect, in call order
    #[derive(Clone, Debug, PartialEq)]
    pub enum Effect {
        PlaceMarker(MarkerId, RoutePoint),
        MoveMarker(MarkerId, RoutePoint),
        RemoveMarker(MarkerId),
        AddLayer(String, usize),
        RemoveLayer(String),
        FlyTo(CameraCommand),
        Speak(String),
        CancelSpeech,
    }

    /// Effect log shared by a map and a speech fake, so ordering across both is visible
    #[derive(Clone, Default)]
    pub struct EffectLog {
        effects: Arc<Mutex<Vec<Effect>>>,
        failing: Arc<AtomicBool>,
    }

    impl EffectLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn map(&self) -> RecordingMap {
            RecordingMap {
                log: self.clone(),
                layers: HashSet::new(),
            }
        }

        pub fn speech(&self) -> RecordingSpeech {
            RecordingSpeech { log: self.clone() }
        }

        /// Make every subsequent call fail with `Unavailable` (still recorded)
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn effects(&self) -> Vec<Effect> {
            self.effects.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.effects.lock().unwrap().clear();
        }

        pub fn spoken(&self) -> Vec<String> {
            self.effects()
                .into_iter()
                .filter_map(|e| match e {
                    Effect::Speak(text) => Some(text),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, predicate: impl Fn(&Effect) -> bool) -> usize {
            self.effects().iter().filter(|e| predicate(e)).count()
        }

        fn record(&self, effect: Effect) -> Result<(), SideEffectError> {
            self.effects.lock().unwrap().push(effect);
            if self.failing.load(Ordering::SeqCst) {
                Err(SideEffectError::Unavailable("test view offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    pub struct RecordingMap {
        log: EffectLog,
        layers: HashSet<String>,
    }

    impl MapView for RecordingMap {
        fn place_marker(
            &mut self,
            id: MarkerId,
            _spec: &MarkerSpec,
            at: RoutePoint,
        ) -> Result<(), SideEffectError> {
            self.log.record(Effect::PlaceMarker(id, at))
        }

        fn move_marker(&mut self, id: MarkerId, at: RoutePoint) -> Result<(), SideEffectError> {
            self.log.record(Effect::MoveMarker(id, at))
        }

        fn remove_marker(&mut self, id: MarkerId) -> Result<(), SideEffectError> {
            self.log.record(Effect::RemoveMarker(id))
        }

        fn add_line_layer(
            &mut self,
            name: &str,
            geometry: &RouteGeometry,
        ) -> Result<(), SideEffectError> {
            self.log
                .record(Effect::AddLayer(name.to_string(), geometry.len()))?;
            self.layers.insert(name.to_string());
            Ok(())
        }

        fn remove_layer(&mut self, name: &str) -> Result<(), SideEffectError> {
            self.log.record(Effect::RemoveLayer(name.to_string()))?;
            self.layers.remove(name);
            Ok(())
        }

        fn has_layer(&self, name: &str) -> bool {
            self.layers.contains(name)
        }

        fn fly_to(&mut self, camera: CameraCommand) -> Result<(), SideEffectError> {
            self.log.record(Effect::FlyTo(camera))
        }
    }

    pub struct RecordingSpeech {
        log: EffectLog,
    }

    impl SpeechOutput for RecordingSpeech {
        fn speak(&mut self, utterance: Utterance) -> Result<(), SideEffectError> {
            self.log.record(Effect::Speak(utterance.text))
        }

        fn cancel_all(&mut self) -> Result<(), SideEffectError> {
            self.log.record(Effect::CancelSpeech)
        }
    }
}
