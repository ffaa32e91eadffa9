use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::GridReplayError;
use crate::replay::pit_windows::DEFAULT_PIT_DURATION_S;

const APP_DIR_NAME: &str = "gridreplay";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_FRAME_INTERVAL_S: f64 = 0.1;
pub const DEFAULT_DEBOUNCE_WINDOW_S: f64 = 0.25;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Seconds between two frames of the replay
    pub frame_interval_s: f64,
    pub pit_fallback_duration_s: f64,
    /// Leaderboard queries closer than this to the last one reuse its standings
    pub debounce_window_s: f64,
    pub playback_speed: f64,
    /// Session datasets directory, platform cache directory when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            frame_interval_s: DEFAULT_FRAME_INTERVAL_S,
            pit_fallback_duration_s: DEFAULT_PIT_DURATION_S,
            debounce_window_s: DEFAULT_DEBOUNCE_WINDOW_S,
            playback_speed: 1.0,
            cache_dir: None,
        }
    }
}

impl ReplayConfig {
    pub fn config_path() -> Result<PathBuf, GridReplayError> {
        Ok(dirs::config_dir()
            .ok_or(GridReplayError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Config saved by a previous run, if there is one that can be read
    pub fn from_local_file() -> Option<Self> {
        let config_path = Self::config_path().ok()?;
        if !config_path.exists() {
            return None;
        }
        match Self::from_file(&config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, GridReplayError> {
        let file =
            std::fs::File::open(path).map_err(|e| GridReplayError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| GridReplayError::ConfigSerializeError { source: e })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), GridReplayError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), GridReplayError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GridReplayError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| GridReplayError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| GridReplayError::ConfigSerializeError { source: e })
    }

    pub fn validate(&self) -> Result<(), GridReplayError> {
        let positive = [
            ("frame_interval_s", self.frame_interval_s),
            ("pit_fallback_duration_s", self.pit_fallback_duration_s),
            ("debounce_window_s", self.debounce_window_s),
            ("playback_speed", self.playback_speed),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.) {
                return Err(GridReplayError::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }
        Ok(())
    }
}
