// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{APP_DIR_NAME, IDEAL_CAPTURE_HEIGHT, IDEAL_CAPTURE_WIDTH, SizeLabel};
use crate::errors::{AppError, AppResult};
use crate::geometry::ViewportSize;
use crate::pipelines::photo::EncodingQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file name inside the app config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Preference file name inside the app config directory
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Ideal capture resolution requested from the camera
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct CaptureResolution {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureResolution {
    fn default() -> Self {
        Self {
            width: IDEAL_CAPTURE_WIDTH,
            height: IDEAL_CAPTURE_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size preset selected on startup
    pub default_size: SizeLabel,
    /// JPEG quality preset for snapshots
    pub jpeg_quality: EncodingQuality,
    /// Resolution hint sent with every stream request
    pub ideal_resolution: CaptureResolution,
    /// Where snapshots are written by file-backed hosts
    pub photo_dir: PathBuf,
    /// Window size assumed by hosts without a real window
    pub initial_viewport: ViewportSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_size: SizeLabel::default(),
            jpeg_quality: EncodingQuality::default(),
            ideal_resolution: CaptureResolution::default(),
            photo_dir: default_photo_dir(),
            initial_viewport: ViewportSize::new(640, 480),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults if absent
    pub fn load() -> AppResult<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("invalid {}: {}", path.display(), e)))
    }
}

/// `$XDG_CONFIG_HOME/board-camera`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

pub fn preferences_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(PREFERENCES_FILE_NAME))
}

/// `~/Pictures/board-camera`, or the current directory without a home
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
