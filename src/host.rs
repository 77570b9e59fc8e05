// SPDX-License-Identifier: GPL-3.0-only

//! Capabilities the embedding shell provides to the widget
//!
//! The core never reaches for globals: window sizing, image insertion and
//! preference persistence are injected through these traits by whatever
//! hosts the widget (the terminal viewer, the CLI, or a test double).

use crate::errors::AppResult;
use crate::geometry::ViewportSize;
use std::future::Future;

/// Image handed to the host for insertion into its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageObject {
    /// `data:image/jpeg;base64,...`
    pub data_uri: String,
    pub x: i32,
    pub y: i32,
    /// Zero means natural size
    pub width: u32,
    /// Zero means natural size
    pub height: u32,
    /// Whether the host should prevent the user from rotating the object
    pub rotation_locked: bool,
}

impl ImageObject {
    /// Place an image at the origin at its natural size, rotatable
    pub fn at_origin(data_uri: String) -> Self {
        Self {
            data_uri,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            rotation_locked: false,
        }
    }
}

/// Window/document shell hosting the widget
pub trait WidgetHost: Send + Sync {
    /// Current size of the hosting window
    fn viewport(&self) -> ViewportSize;

    /// Ask the host to resize its window
    fn resize(&self, width: u32, height: u32);

    /// Insert an image into the host document (fire-and-forget)
    fn add_object(&self, object: ImageObject);
}

/// Persistent key/value preferences owned by the host
pub trait PreferenceStore: Send + Sync {
    /// Read a stored value
    fn preference(&self, key: &str) -> impl Future<Output = Option<String>> + Send;

    /// Store a value
    fn set_preference(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = AppResult<()>> + Send;
}
