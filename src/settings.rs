use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::clock::parse_time;
use crate::paths::resolve_settings_path;

pub const DEFAULT_DAY_START: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(time) => time,
    None => panic!("default day start must be a valid time"),
};
pub const DEFAULT_SLOT_BUFFER_MINUTES: u32 = 30;

/// Tunables for slot suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerSettings {
    /// Suggested start on a day with nothing scheduled.
    pub day_start: NaiveTime,
    /// Gap left after the last activity of a day.
    pub slot_buffer_minutes: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            day_start: DEFAULT_DAY_START,
            slot_buffer_minutes: DEFAULT_SLOT_BUFFER_MINUTES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    day_start: Option<String>,
    slot_buffer_minutes: Option<u32>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid settings {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl PlannerSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    /// Parses TOML settings; `origin` only labels errors.
    pub fn from_toml(raw: &str, origin: &Path) -> Result<Self, SettingsError> {
        let file: SettingsFile = toml::from_str(raw).map_err(|source| SettingsError::Decode {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut settings = Self::default();
        if let Some(day_start) = file.day_start {
            settings.day_start = parse_time(&day_start).map_err(|err| SettingsError::Invalid {
                path: origin.to_path_buf(),
                message: format!("day_start: {err}"),
            })?;
        }
        if let Some(slot_buffer_minutes) = file.slot_buffer_minutes {
            settings.slot_buffer_minutes = slot_buffer_minutes;
        }

        Ok(settings)
    }
}

/// Loads settings from the resolved settings file, or defaults when there is
/// none.
pub fn load_settings(cli_path: Option<PathBuf>) -> Result<PlannerSettings, SettingsError> {
    match resolve_settings_path(cli_path) {
        Some(path) => {
            let settings = PlannerSettings::load(&path)?;
            debug!(path = %path.display(), ?settings, "loaded planner settings");
            Ok(settings)
        }
        None => Ok(PlannerSettings::default()),
    }
}
