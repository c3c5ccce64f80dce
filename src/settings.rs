use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::presence::{SessionConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_REFRESH_INTERVAL};
use crate::profiles::Theme;

const APP_DIR: &str = "oxy";
const SETTINGS_FILE: &str = "settings.json";
const PROFILES_DIR: &str = "profiles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Where profiles are stored; defaults to `<data dir>/oxy/profiles`
    pub profiles_dir: Option<PathBuf>,
    pub refresh_interval_secs: u64,
    pub call_timeout_secs: u64,
    pub theme: Theme,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profiles_dir: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            theme: Theme::default(),
        }
    }
}

impl AppSettings {
    pub fn profiles_dir(&self) -> PathBuf {
        self.profiles_dir
            .clone()
            .unwrap_or_else(|| data_dir().join(PROFILES_DIR))
    }

    /// Session timings, with zero values replaced by the defaults
    pub fn session_config(&self) -> SessionConfig {
        let secs_or = |secs: u64, default: Duration| {
            if secs == 0 {
                default
            } else {
                Duration::from_secs(secs)
            }
        };

        SessionConfig {
            refresh_interval: secs_or(self.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL),
            call_timeout: secs_or(self.call_timeout_secs, DEFAULT_CALL_TIMEOUT),
        }
    }
}

/// Per-user application data directory
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE)
}

pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    tracing::debug!("Loading settings from {}", path.display());

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| SettingsError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    tracing::debug!("Saving settings to {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let contents = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;

    fs::write(path, contents).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
