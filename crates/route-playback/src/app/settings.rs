use clap::{Args, Parser, Subcommand};
use route_playback_lib::{FollowCamera, NarrationConfig, PlaybackConfig, RoutePoint, utils};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Route Playback - Walk a vehicle along a delivery route with camera follow and spoken maneuvers
pub struct Settings {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Plan a route from a directions GeoJSON or GPX file and play it back
    Play(PlayArgs),
    /// Print autocomplete suggestions from a geocoding FeatureCollection
    Suggest(SuggestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// Directions GeoJSON (.json, .geojson) or GPX (.gpx) file
    #[clap(value_name = "FILE")]
    pub route_file: PathBuf,

    /// Delivery origin as "lon,lat" (defaults to the first route point)
    #[clap(long, value_name = "LON,LAT", value_parser = parse_point, allow_hyphen_values = true)]
    pub from: Option<RoutePoint>,

    /// Delivery destination as "lon,lat" (defaults to the last route point)
    #[clap(long, value_name = "LON,LAT", value_parser = parse_point, allow_hyphen_values = true)]
    pub to: Option<RoutePoint>,

    /// Milliseconds between playback ticks
    #[clap(short, long, default_value = "300")]
    pub tick_ms: u64,

    /// Leave the camera alone instead of following the vehicle
    #[clap(long)]
    pub no_follow: bool,

    /// Camera zoom while following
    #[clap(long, default_value = "17.0")]
    pub zoom: f64,

    /// Camera pitch in degrees while following
    #[clap(long, default_value = "45.0")]
    pub pitch: f64,

    /// Keep north up instead of rotating the map to the vehicle heading
    #[clap(long)]
    pub north_up: bool,

    /// Narration voice locale
    #[clap(long, default_value = "en-US")]
    pub locale: String,

    /// Narration speech rate
    #[clap(long, default_value = "1.0")]
    pub rate: f32,

    /// Narration voice pitch
    #[clap(long, default_value = "1.0")]
    pub voice_pitch: f32,
}

#[derive(Args, Debug, Clone)]
pub struct SuggestArgs {
    /// Geocoding FeatureCollection used as the gazetteer
    #[clap(value_name = "GAZETTEER")]
    pub gazetteer: PathBuf,

    /// Partial address to complete
    pub query: String,

    /// Maximum number of suggestions
    #[clap(short, long, default_value = "10")]
    pub limit: usize,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }
}

impl PlayArgs {
    /// Library playback configuration for these arguments
    pub fn playback_config(&self) -> PlaybackConfig {
        let defaults = PlaybackConfig::default();
        let follow_camera = (!self.no_follow).then(|| FollowCamera {
            zoom: self.zoom,
            pitch: self.pitch,
            heading_up: !self.north_up,
            ..FollowCamera::default()
        });

        PlaybackConfig {
            tick_interval: Duration::from_millis(self.tick_ms),
            follow_camera,
            narration: NarrationConfig {
                locale: self.locale.clone(),
                rate: self.rate,
                pitch: self.voice_pitch,
            },
            ..defaults
        }
    }
}

fn parse_point(text: &str) -> Result<RoutePoint, String> {
    utils::parse_coordinate(text)
        .map(RoutePoint::from)
        .ok_or_else(|| format!("expected \"lon,lat\" inside WGS84 bounds, got {text:?}"))
}
