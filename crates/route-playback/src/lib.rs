//! Route Playback - Application Library
//!
//! Command-line front end for `route-playback-lib`: plans a delivery route
//! from a saved directions or GPX file, then plays it back on a console map
//! view that logs every marker, camera and voice effect.

mod app;

pub use app::console::{ConsoleMapView, ConsoleSpeech};
pub use app::logging::{LoggingGuard, setup_logging};
pub use app::route_file::{RouteFile, RouteFormat};
pub use app::settings::{Command, PlayArgs, Settings, SuggestArgs};
pub use app::{AppError, run};
