//! Spoken maneuver instructions

use crate::{ManeuverStep, Utterance};
#[cfg(feature = "use-serde")]
use serde::{Deserialize, Serialize};

/// Voice settings applied to every narrated step
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(Serialize, Deserialize))]
pub struct NarrationConfig {
    /// BCP 47 language tag
    pub locale: String,
    /// Speech rate (0.5 to 2.0)
    pub rate: f32,
    /// Speech pitch (0.0 to 2.0)
    pub pitch: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl NarrationConfig {
    /// Wrap text into an utterance with these voice settings
    pub fn utterance(&self, text: impl Into<String>) -> Utterance {
        Utterance {
            text: text.into(),
            locale: self.locale.clone(),
            rate: self.rate,
            pitch: self.pitch,
        }
    }
}

/// Format the spoken text for a step
///
/// `position` is 1-based within the step list. The distance is rounded half away
/// from zero to whole meters.
///
/// ```
/// use route_playback_lib::{ManeuverStep, format_instruction};
///
/// let step = ManeuverStep::new("Turn right", 42.4, [0, 1]);
/// assert_eq!(format_instruction(1, &step), "Step 1: Turn right, at 42 meters");
/// ```
pub fn format_instruction(position: usize, step: &ManeuverStep) -> String {
    let meters = step.distance_meters.round() as i64;
    format!("Step {}: {}, at {} meters", position, step.instruction, meters)
}
