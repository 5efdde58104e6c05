//! Route Playback Library - Core of the delivery-route walkthrough
//!
//! This library animates a "vehicle" marker along a pre-computed route, keeps the
//! camera following it and narrates each maneuver as the vehicle enters it. Routing,
//! geocoding and rendering are external: they are reached through small traits.
//!
//! # Architecture
//!
//! - **[`RouteGeometry`] / [`ManeuverStep`]**: Immutable route data from a directions service
//! - **[`StepIndex`]**: Point index to maneuver lookup, built once per playback
//! - **[`RoutePlaybackSequencer`]**: Idle/Running/Completed state machine driven by `tick`
//! - **[`PlaybackDriver`]**: Fixed-cadence tokio timer around a shared sequencer
//! - **[`DeliveryPlanner`]**: Origin/destination placement and route calculation
//! - **[`MapView`] / [`SpeechOutput`]**: Side-effect sinks implemented by the host UI
//! - **[`RouteProvider`] / [`AddressSuggestionProvider`]**: Directions and autocomplete sources

mod directions;
mod driver;
mod effects;
mod geocoding;
mod narration;
mod planner;
mod route;
mod sequencer;
mod step_index;
pub mod utils;

// Public API exports
pub use directions::{DirectionsFileProvider, GpxTrackProvider, RouteProvider, parse_directions};
pub use driver::PlaybackDriver;
pub use effects::{CameraCommand, MapView, MarkerId, MarkerSpec, SpeechOutput, Utterance};
pub use geocoding::{
    AddressSuggestion, AddressSuggestionProvider, StaticSuggestionProvider, SuggestionDebouncer,
    parse_geocoding_response,
};
pub use narration::{NarrationConfig, format_instruction};
pub use planner::{DeliveryPlanner, Placement, PlannerConfig, ROUTE_LAYER};
pub use route::{ManeuverStep, PlannedRoute, RouteGeometry, RoutePoint};
pub use sequencer::{
    FollowCamera, PlaybackConfig, PlaybackState, PlaybackStatus, RoutePlaybackSequencer,
    TickOutcome,
};
pub use step_index::StepIndex;

/// Why a geometry was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRoute {
    #[error("Route geometry is empty")]
    EmptyGeometry,

    #[error("Point {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Errors returned by playback control operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] InvalidRoute),

    #[error("Playback is already running")]
    AlreadyRunning,

    #[error("No async runtime available to schedule ticks")]
    NoRuntime,
}

/// Failure of a map view or speech output call
///
/// These never stop playback; the sequencer logs them and keeps advancing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SideEffectError {
    #[error("Side effect target unavailable: {0}")]
    Unavailable(String),

    #[error("Side effect rejected: {0}")]
    Rejected(String),
}

/// Errors from route providers
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directions JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("Directions response contains no route")]
    MissingRoute,

    #[error("Unsupported route geometry type: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] InvalidRoute),

    #[error("Invalid coordinate string: {0:?}")]
    Coordinate(String),
}

/// Errors from address suggestion providers
#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("Geocoding JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Geocoding provider error: {0}")]
    Provider(String),
}

/// Errors from the delivery planner
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Both origin and destination must be placed first")]
    MissingEndpoints,

    #[error("Map view error: {0}")]
    View(#[from] SideEffectError),

    #[error("Route calculation failed: {0}")]
    Route(#[from] RouteError),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
