//! Tuning file support.

use std::{fs, path::Path};

use midnight_drive_system_pursuer::PursuerTuning;
use midnight_drive_system_traffic::TrafficTuning;
use midnight_drive_system_vehicle::VehicleTuning;
use midnight_drive_world::WorldConfig;
use serde::Deserialize;
use thiserror::Error;

/// Frame timing and hit handling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameTuning {
    /// Frame rate at which the normalized step equals one.
    pub target_fps: f32,
    /// Upper bound of the normalized step.
    pub max_step: f32,
    /// Real seconds between two consecutive pursuer hits.
    pub hit_cooldown_seconds: f32,
    /// Speed factor applied to the car when the pursuer hits.
    pub pursuer_penalty: f32,
}

impl Default for FrameTuning {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            max_step: 3.0,
            hit_cooldown_seconds: 2.0,
            pursuer_penalty: -0.5,
        }
    }
}

/// Every tunable parameter of a session.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// City generation parameters.
    pub world: WorldConfig,
    /// Player car constants.
    pub vehicle: VehicleTuning,
    /// Traffic spawning and patrol parameters.
    pub traffic: TrafficTuning,
    /// Pursuer parameters.
    pub pursuer: PursuerTuning,
    /// Frame timing and hit handling.
    pub frame: FrameTuning,
}

/// Failures while loading a tuning file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read tuning file {path}")]
    Read {
        /// Path that was requested.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid tuning TOML.
    #[error("invalid tuning file")]
    Parse(#[from] toml::de::Error),
}

impl SimulationConfig {
    /// Parses a TOML document; omitted tables and keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Replaces the world and traffic seeds.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.world.seed = seed;
        self.traffic.seed = seed.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15;
        self
    }
}
