//! RoutePlaybackSequencer - Time-stepped walkthrough of a route
//!
//! The sequencer is a plain state machine. It owns no timer: every call to
//! [`RoutePlaybackSequencer::tick`] advances the vehicle by one geometry point.
//! [`crate::PlaybackDriver`] calls it on a fixed cadence.
//!
//! ```text
//! Idle --start--> Running --tick (cursor past end)--> Completed
//!   ^               |                                     |
//!   +-----stop------+----------------stop-----------------+
//! ```
//!
//! Side effects are best effort. A failing map view or speech output is logged
//! and playback keeps advancing, so a torn-down view still reaches `Completed`.

use crate::{
    CameraCommand, ManeuverStep, MapView, MarkerId, MarkerSpec, NarrationConfig, PlaybackError,
    Result, RouteGeometry, RoutePoint, SideEffectError, SpeechOutput, StepIndex, format_instruction,
    utils,
};
#[cfg(feature = "use-serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a playback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Result of a single tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The vehicle moved to `index`; `narrated` is the step position spoken on this tick
    Advanced {
        index: usize,
        narrated: Option<usize>,
    },
    /// The geometry was exhausted on this tick (reported once per run)
    Completed,
    /// Not running: a stale tick
    Ignored,
}

/// Camera parameters used while following the vehicle
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct FollowCamera {
    pub zoom: f64,
    pub speed: f64,
    pub pitch: f64,
    /// Rotate the map so the vehicle heads up the screen
    pub heading_up: bool,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            zoom: 17.0,
            speed: 1.2,
            pitch: 45.0,
            heading_up: true,
        }
    }
}

/// Playback configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct PlaybackConfig {
    /// Delay between ticks
    pub tick_interval: Duration,
    /// Camera follow settings; `None` leaves the camera alone
    pub follow_camera: Option<FollowCamera>,
    /// Voice settings for narration
    pub narration: NarrationConfig,
    /// Appearance of the vehicle marker
    pub vehicle_marker: MarkerSpec,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(300),
            follow_camera: Some(FollowCamera::default()),
            narration: NarrationConfig::default(),
            vehicle_marker: MarkerSpec::new("red").with_label("Vehicle"),
        }
    }
}

/// Snapshot of the sequencer, published by the driver after every change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Next point index to visit (while running)
    pub cursor: Option<usize>,
    /// Number of points in the active geometry (while running)
    pub len: Option<usize>,
    /// Position of the last narrated step (while running)
    pub current_step: Option<usize>,
    /// How many runs reached `Completed` over the sequencer's lifetime
    pub runs_completed: u64,
}

/// Per-run state, created by `start` and dropped on completion or stop
#[derive(Debug)]
struct PlaybackRun {
    generation: u64,
    cursor: usize,
    geometry: Arc<RouteGeometry>,
    steps: Arc<[ManeuverStep]>,
    step_index: StepIndex,
    current_step: Option<usize>,
}

/// Drives a vehicle marker along a route geometry, one point per tick
pub struct RoutePlaybackSequencer<M, S> {
    map: M,
    speech: S,
    config: PlaybackConfig,
    state: PlaybackState,
    run: Option<PlaybackRun>,
    /// Whether the vehicle marker is (believed to be) on the map
    vehicle_placed: bool,
    next_generation: u64,
    runs_completed: u64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<M: MapView, S: SpeechOutput> RoutePlaybackSequencer<M, S> {
    /// Create an idle sequencer around a map view and speech output
    pub fn new(map: M, speech: S, config: PlaybackConfig) -> Self {
        Self {
            map,
            speech,
            config,
            state: PlaybackState::Idle,
            run: None,
            vehicle_placed: false,
            next_generation: 0,
            runs_completed: 0,
        }
    }

    /// Start a playback over `geometry`
    ///
    /// Allowed from `Idle` and `Completed`. Places the vehicle marker on the
    /// first point; the first `tick` then visits that point. A
    /// [`RouteGeometry`] is never empty; raw points go through
    /// [`Self::start_points`], which rejects an empty list.
    pub fn start(
        &mut self,
        geometry: Arc<RouteGeometry>,
        steps: Arc<[ManeuverStep]>,
    ) -> Result<()> {
        if self.state == PlaybackState::Running {
            return Err(PlaybackError::AlreadyRunning);
        }
        let step_index = StepIndex::build(&steps, geometry.len());
        let first = geometry.first();
        let generation = self.next_generation;
        self.next_generation += 1;

        tracing::info!(
            "Starting playback #{}: {} points, {} steps, {:.0} m",
            generation,
            geometry.len(),
            steps.len(),
            geometry.total_distance()
        );

        let spec = self.config.vehicle_marker.clone();
        let placed = self.map.place_marker(MarkerId::VEHICLE, &spec, first);
        self.vehicle_placed = Self::best_effort("place vehicle marker", placed);

        self.run = Some(PlaybackRun {
            generation,
            cursor: 0,
            geometry,
            steps,
            step_index,
            current_step: None,
        });
        self.state = PlaybackState::Running;
        Ok(())
    }

    /// Validate raw points and start a playback over them
    pub fn start_points(
        &mut self,
        points: impl IntoIterator<Item = RoutePoint>,
        steps: Vec<ManeuverStep>,
    ) -> Result<()> {
        if self.state == PlaybackState::Running {
            return Err(PlaybackError::AlreadyRunning);
        }
        let geometry = RouteGeometry::new(points)?;
        self.start(Arc::new(geometry), steps.into())
    }

    /// Advance the playback by one point
    ///
    /// Effect order within a tick: marker move, camera follow, narration.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(run) = self.run.as_mut() else {
            tracing::trace!("Ignoring stale tick while {:?}", self.state);
            return TickOutcome::Ignored;
        };

        let index = run.cursor;
        let Some(point) = run.geometry.get(index) else {
            self.complete();
            return TickOutcome::Completed;
        };

        let moved = self.map.move_marker(MarkerId::VEHICLE, point);
        Self::best_effort("move vehicle marker", moved);

        if let Some(follow) = self.config.follow_camera {
            let bearing = follow
                .heading_up
                .then(|| Self::heading(&run.geometry, index))
                .flatten();
            let camera = CameraCommand {
                center: point,
                zoom: follow.zoom,
                speed: follow.speed,
                bearing,
                pitch: Some(follow.pitch),
            };
            Self::best_effort("follow vehicle", self.map.fly_to(camera));
        }

        let mut narrated = None;
        if let Some(position) = run.step_index.step_at(index)
            && run.current_step != Some(position)
        {
            run.current_step = Some(position);
            narrated = Some(position);

            let text = format_instruction(position + 1, &run.steps[position]);
            tracing::debug!("Point {}: {}", index, text);
            let utterance = self.config.narration.utterance(text);
            Self::best_effort("narrate step", self.speech.speak(utterance));
        }

        run.cursor += 1;
        TickOutcome::Advanced { index, narrated }
    }

    /// Abort any playback and return to `Idle`
    ///
    /// Idempotent and valid in every state.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::info!(
                "Stopping playback #{} at point {}/{}",
                run.generation,
                run.cursor,
                run.geometry.len()
            );
        }
        Self::best_effort("cancel narration", self.speech.cancel_all());
        self.remove_vehicle();
        self.state = PlaybackState::Idle;
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Generation of the active run, if running
    ///
    /// A timer compares this with the generation it was scheduled for so that a
    /// tick belonging to an aborted run does nothing.
    #[inline]
    pub fn run_generation(&self) -> Option<u64> {
        self.run.as_ref().map(|run| run.generation)
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            cursor: self.run.as_ref().map(|run| run.cursor),
            len: self.run.as_ref().map(|run| run.geometry.len()),
            current_step: self.run.as_ref().and_then(|run| run.current_step),
            runs_completed: self.runs_completed,
        }
    }

    #[inline]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    fn complete(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::info!(
                "Playback #{} completed after {} points",
                run.generation,
                run.geometry.len()
            );
        }
        self.remove_vehicle();
        Self::best_effort("cancel narration", self.speech.cancel_all());
        self.state = PlaybackState::Completed;
        self.runs_completed += 1;
    }

    fn remove_vehicle(&mut self) {
        if self.vehicle_placed {
            let removed = self.map.remove_marker(MarkerId::VEHICLE);
            Self::best_effort("remove vehicle marker", removed);
            self.vehicle_placed = false;
        }
    }

    /// Bearing from point `index` toward the next distinct point
    fn heading(geometry: &RouteGeometry, index: usize) -> Option<f64> {
        let here = geometry.get(index)?;
        geometry
            .points()
            .skip(index + 1)
            .find(|p| *p != here)
            .map(|next| utils::initial_bearing(here.into(), next.into()))
    }

    fn best_effort(what: &str, result: std::result::Result<(), SideEffectError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not {}: {}", what, e);
                false
            }
        }
    }
}
