// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera widget

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Photo capture errors
    Photo(PhotoError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// The host has no camera support at all (terminal state, no retry)
    Unavailable,
    /// Enumeration returned no video inputs
    NoCameraFound,
    /// The remembered device label is gone after re-enumeration
    DeviceVanished(String),
    /// The host refused or failed to grant a stream
    AcquisitionFailed(BackendError),
    /// A newer acquisition started before this one landed
    Superseded,
}

/// Photo capture errors
#[derive(Debug, Clone)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// The stream has not reported its resolution yet
    MetadataNotReady,
    /// The frame could not be rendered into the snapshot canvas
    RenderFailed(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

impl CameraError {
    /// Whether the error leaves the widget in the recoverable "no camera" state
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CameraError::Unavailable)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Unavailable => write!(f, "Camera API is not available"),
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::DeviceVanished(label) => {
                write!(f, "Camera '{}' is no longer available", label)
            }
            CameraError::AcquisitionFailed(e) => write!(f, "Failed to acquire stream: {}", e),
            CameraError::Superseded => write!(f, "Acquisition superseded by a newer request"),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::MetadataNotReady => write!(f, "Video metadata not ready"),
            PhotoError::RenderFailed(msg) => write!(f, "Render failed: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for PhotoError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotAvailable(_) => CameraError::Unavailable,
            other => CameraError::AcquisitionFailed(other),
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_terminal() {
        assert!(!CameraError::Unavailable.is_recoverable());
        assert!(CameraError::NoCameraFound.is_recoverable());
        assert!(CameraError::DeviceVanished("Cam1".into()).is_recoverable());
    }

    #[test]
    fn backend_not_available_maps_to_unavailable() {
        let err: CameraError = BackendError::NotAvailable("no v4l".into()).into();
        assert!(matches!(err, CameraError::Unavailable));

        let err: CameraError = BackendError::PermissionDenied("/dev/video0".into()).into();
        assert!(matches!(
            err,
            CameraError::AcquisitionFailed(BackendError::PermissionDenied(_))
        ));
    }

    #[test]
    fn display_includes_label() {
        let msg = CameraError::DeviceVanished("Cam2".into()).to_string();
        assert!(msg.contains("Cam2"));
    }
}
