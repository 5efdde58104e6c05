//! Application module
//!
//! Two commands:
//! - `play`: load a saved route, place the delivery endpoints, calculate the
//!   route through the planner and play it back until it completes or Ctrl-C
//! - `suggest`: autocomplete a partial address against a local gazetteer

pub(crate) mod console;
pub(crate) mod logging;
pub(crate) mod route_file;
pub(crate) mod settings;

use crate::app::console::{ConsoleMapView, ConsoleSpeech};
use crate::app::route_file::RouteFile;
use crate::app::settings::{Command, PlayArgs, Settings, SuggestArgs};
use route_playback_lib::{
    AddressSuggestion, AddressSuggestionProvider, DeliveryPlanner, GeocodingError, PlaybackDriver,
    PlaybackError, PlaybackState, PlannerConfig, PlannerError, RouteError, RoutePlaybackSequencer,
    StaticSuggestionProvider, utils,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Errors surfaced by the command-line app
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported route file {0}: expected .json, .geojson or .gpx")]
    UnsupportedFile(PathBuf),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
}

/// How a `play` command ended
#[derive(Debug)]
struct PlaybackReport {
    state: PlaybackState,
    points: usize,
    narrated: Vec<String>,
}

/// Execute the parsed command
pub async fn run(settings: Settings) -> Result<(), AppError> {
    match settings.command {
        Command::Play(args) => {
            let report = play(&args).await?;
            match report.state {
                PlaybackState::Completed => tracing::info!(
                    "Playback completed: {} points, {} maneuvers narrated",
                    report.points,
                    report.narrated.len()
                ),
                state => tracing::warn!(
                    "Playback ended early ({:?}) after {} maneuvers",
                    state,
                    report.narrated.len()
                ),
            }
        }
        Command::Suggest(args) => {
            let suggestions = suggest(&args)?;
            if suggestions.is_empty() {
                tracing::info!("No suggestions for {:?}", args.query);
            }
            for suggestion in suggestions {
                println!(
                    "{}\t{}",
                    suggestion.name,
                    utils::format_coordinate(suggestion.point.into())
                );
            }
        }
    }
    Ok(())
}

async fn play(args: &PlayArgs) -> Result<PlaybackReport, AppError> {
    let route_file = RouteFile::load(&args.route_file)?;
    let planned = route_file.planned_route();
    let origin = args.from.unwrap_or_else(|| planned.geometry.first());
    let destination = args.to.unwrap_or_else(|| planned.geometry.last());

    let map = Arc::new(Mutex::new(ConsoleMapView::new()));
    let mut planner = DeliveryPlanner::new(map.clone(), PlannerConfig::default());
    planner.reset_view()?;
    planner.place(origin)?;
    planner.place(destination)?;
    let route = planner.calculate_route(&route_file)?.clone();

    let sequencer = RoutePlaybackSequencer::new(map, ConsoleSpeech::new(), args.playback_config());
    let mut driver = PlaybackDriver::new(sequencer);
    driver.start(route.geometry.clone(), route.steps.clone())?;

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let interrupted = tokio::select! {
        _ = driver.finished() => false,
        _ = ctrl_c => true,
    };
    if interrupted {
        tracing::warn!("Interrupted, stopping playback");
        driver.stop();
    }

    let report = PlaybackReport {
        state: driver.state(),
        points: route.geometry.len(),
        narrated: driver.with_sequencer(|sequencer| sequencer.speech_mut().spoken().to_vec()),
    };
    drop(driver);
    planner.clear()?;
    Ok(report)
}

fn suggest(args: &SuggestArgs) -> Result<Vec<AddressSuggestion>, AppError> {
    let json = std::fs::read_to_string(&args.gazetteer).map_err(|source| AppError::Io {
        path: args.gazetteer.clone(),
        source,
    })?;
    let provider = StaticSuggestionProvider::from_geojson(&json)?.with_limit(args.limit);
    tracing::debug!(
        "Gazetteer {} holds {} places",
        args.gazetteer.display(),
        provider.len()
    );
    Ok(provider.suggest(&args.query)?)
}
