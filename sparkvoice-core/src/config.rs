use crate::types::CameraMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightDefaults {
    pub climb_offset_m: f64,
    pub min_target_altitude_m: f64,

    // Used when the flight controller cannot report its altitude.
    pub fallback_altitude_m: f64,
}

impl Default for FlightDefaults {
    fn default() -> Self {
        Self {
            climb_offset_m: 3.0,
            min_target_altitude_m: 3.0,
            fallback_altitude_m: 4.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub flight: FlightDefaults,

    // The mission engine has no "timeline finished" signal; completion is reported after this.
    pub timeline_completion_delay_ms: u64,

    // Settling delay between the start of a media download and restoring the camera mode.
    pub mode_restore_delay_ms: u64,

    pub photo_mode: CameraMode,
    pub download_mode: CameraMode,

    pub photo_dir: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            flight: FlightDefaults::default(),
            timeline_completion_delay_ms: 1500,
            mode_restore_delay_ms: 2000,
            photo_mode: CameraMode::ShootPhoto,
            download_mode: CameraMode::MediaDownload,
            photo_dir: None,
        }
    }
}

impl ControllerConfig {
    pub fn timeline_completion_delay(&self) -> Duration {
        Duration::from_millis(self.timeline_completion_delay_ms)
    }

    pub fn mode_restore_delay(&self) -> Duration {
        Duration::from_millis(self.mode_restore_delay_ms)
    }
}

/// Target altitude for the photo-position routine: `max(current + offset, minimum)`, or the
/// fallback when the current altitude is unknown.
pub fn photo_position_altitude(current_altitude_m: Option<f64>, flight: &FlightDefaults) -> f64 {
    match current_altitude_m {
        Some(current) if current.is_finite() => {
            (current + flight.climb_offset_m).max(flight.min_target_altitude_m)
        }
        _ => flight.fallback_altitude_m,
    }
}
