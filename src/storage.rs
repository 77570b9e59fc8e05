// SPDX-License-Identifier: MPL-2.0

//! Storage-backed host capabilities
//!
//! - [`JsonPreferenceStore`]: persisted key/value preferences
//! - [`MemoryPreferenceStore`]: preferences for hosts without a config dir
//! - [`FileImageSink`]: writes emitted snapshots into the photo directory

use crate::errors::{AppError, AppResult, PhotoError};
use crate::geometry::ViewportSize;
use crate::host::{ImageObject, PreferenceStore, WidgetHost};
use crate::pipelines::photo::{SNAPSHOT_EXTENSION, decode_data_uri};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

type PreferenceMap = HashMap<String, String>;

/// Preferences stored as a flat JSON object of strings
#[derive(Debug)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_map(&self) -> PreferenceMap {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to read preferences");
                }
                return PreferenceMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring malformed preferences");
            PreferenceMap::new()
        })
    }
}

impl PreferenceStore for JsonPreferenceStore {
    async fn preference(&self, key: &str) -> Option<String> {
        self.read_map().await.remove(key)
    }

    async fn set_preference(&self, key: &str, value: String) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.read_map().await;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&map)?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", self.path.display(), e)))?;

        debug!(key, path = %self.path.display(), "Preference written");
        Ok(())
    }
}

/// Preferences that live only as long as the process
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<PreferenceMap>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    async fn preference(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    async fn set_preference(&self, key: &str, value: String) -> AppResult<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Headless widget host that saves every emitted image to disk
#[derive(Debug)]
pub struct FileImageSink {
    output_dir: PathBuf,
    viewport: Mutex<ViewportSize>,
    saved: Mutex<Vec<PathBuf>>,
}

impl FileImageSink {
    pub fn new(output_dir: impl Into<PathBuf>, viewport: ViewportSize) -> Self {
        Self {
            output_dir: output_dir.into(),
            viewport: Mutex::new(viewport),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Files written so far, oldest first
    pub fn saved(&self) -> Vec<PathBuf> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Decode `object` and write it under a timestamped name
    pub fn write(&self, object: &ImageObject) -> Result<PathBuf, PhotoError> {
        let data = decode_data_uri(&object.data_uri)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let mut path = self
            .output_dir
            .join(format!("IMG_{}.{}", timestamp, SNAPSHOT_EXTENSION));
        let mut suffix = 1;
        while path.exists() {
            path = self.output_dir.join(format!(
                "IMG_{}_{}.{}",
                timestamp, suffix, SNAPSHOT_EXTENSION
            ));
            suffix += 1;
        }

        std::fs::write(&path, &data)
            .map_err(|e| PhotoError::SaveFailed(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

impl WidgetHost for FileImageSink {
    fn viewport(&self) -> ViewportSize {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resize(&self, width: u32, height: u32) {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner) =
            ViewportSize::new(width, height);
    }

    fn add_object(&self, object: ImageObject) {
        match self.write(&object) {
            Ok(path) => {
                info!(path = %path.display(), "Snapshot saved");
                self.saved
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(path);
            }
            Err(e) => error!(error = %e, "Failed to save snapshot"),
        }
    }
}
