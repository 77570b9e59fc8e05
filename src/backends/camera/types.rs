// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera host capabilities

//! Shared types for camera backends

use image::RgbImage;
use std::sync::Arc;

/// Kind of media device reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Camera or other video capture source
    VideoInput,
    /// Microphone
    AudioInput,
    /// Speaker or headset
    AudioOutput,
    /// Metadata nodes, output devices and anything else
    Other,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::VideoInput => write!(f, "videoinput"),
            DeviceKind::AudioInput => write!(f, "audioinput"),
            DeviceKind::AudioOutput => write!(f, "audiooutput"),
            DeviceKind::Other => write!(f, "other"),
        }
    }
}

/// Raw device entry as returned by host enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    /// Opaque identifier, may change between enumerations
    pub device_id: String,
    /// Human-readable name, may be empty
    pub label: String,
    pub kind: DeviceKind,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind,
        }
    }

    /// Shorthand for a video input entry
    pub fn video(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(device_id, label, DeviceKind::VideoInput)
    }
}

/// A selectable capture device
///
/// Recreated on every enumeration. The label is the durable identity; the id
/// is only good for the current enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub id: String,
    pub label: String,
}

/// Constraints passed to the host when requesting a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Exact device to open; `None` lets the host pick its default
    pub device_id: Option<String>,
    /// Preferred width, the host may grant something else
    pub ideal_width: u32,
    /// Preferred height, the host may grant something else
    pub ideal_height: u32,
}

/// One track of a granted stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Label of the device feeding the track
    pub label: String,
    pub kind: DeviceKind,
}

/// A live capture stream granted by the host
///
/// Implementations must release the device when `stop` is called; the
/// stream controller never holds two of these at once.
pub trait MediaStream: Send {
    /// Tracks carried by this stream
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Resolution the stream is delivering, once known
    fn video_size(&self) -> Option<(u32, u32)>;

    /// Most recent decoded frame
    fn latest_frame(&self) -> Option<CameraFrame>;

    /// Stop every track and release the device
    fn stop(&mut self);

    /// Label of the first video track
    fn video_track_label(&self) -> Option<String> {
        self.tracks()
            .into_iter()
            .find(|track| track.kind == DeviceKind::VideoInput)
            .map(|track| track.label)
    }
}

/// A single decoded frame from the camera, packed RGB24
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl CameraFrame {
    /// Wrap a tightly packed RGB image
    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
        }
    }

    /// RGB value of one pixel, black outside the buffer
    pub fn pixel_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let idx = (y * self.width as usize + x) * 3;

        match self.data.get(idx..idx + 3) {
            Some(rgb) => (rgb[0], rgb[1], rgb[2]),
            None => (0, 0, 0),
        }
    }

    /// Copy into an RGB image
    ///
    /// Returns `None` for frames without pixels or with a short buffer.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let required = self.width as usize * self.height as usize * 3;
        let pixels = self.data.get(..required)?;
        RgbImage::from_raw(self.width, self.height, pixels.to_vec())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for host capability calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The host has no camera support
    NotAvailable(String),
    /// The user or system refused access
    PermissionDenied(String),
    /// Requested device does not exist (or no device at all)
    DeviceNotFound(String),
    /// Device is in use by another process
    DeviceBusy(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl BackendError {
    /// Classify an I/O error raised while opening or configuring `device`
    pub fn from_io(device: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                BackendError::PermissionDenied(device.to_string())
            }
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(device.to_string()),
            _ if err.raw_os_error() == Some(libc::EBUSY) => {
                BackendError::DeviceBusy(device.to_string())
            }
            _ => BackendError::IoError(format!("{}: {}", device, err)),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::DeviceBusy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_frame_roundtrips_to_image() {
        let image = RgbImage::from_fn(4, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let frame = CameraFrame::from_rgb(image.clone());
        assert_eq!(frame.to_rgb_image().unwrap(), image);
    }

    #[test]
    fn test_pixel_lookup_clamps_to_edge() {
        let image = RgbImage::from_fn(2, 2, |x, y| image::Rgb([x as u8 * 100, y as u8 * 100, 1]));
        let frame = CameraFrame::from_rgb(image);
        assert_eq!(frame.pixel_rgb(1, 0), (100, 0, 1));
        assert_eq!(frame.pixel_rgb(9, 9), (100, 100, 1));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = CameraFrame {
            width: 4,
            height: 4,
            data: Arc::from(vec![0u8; 10]),
        };
        assert!(frame.to_rgb_image().is_none());
    }

    #[test]
    fn test_io_error_classification() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            BackendError::from_io("/dev/video0", &denied),
            BackendError::PermissionDenied(_)
        ));

        let busy = std::io::Error::from_raw_os_error(libc::EBUSY);
        assert!(matches!(
            BackendError::from_io("/dev/video0", &busy),
            BackendError::DeviceBusy(_)
        ));
    }

    #[test]
    fn test_video_track_label_skips_audio() {
        struct Fixed;
        impl MediaStream for Fixed {
            fn tracks(&self) -> Vec<TrackInfo> {
                vec![
                    TrackInfo {
                        label: "Mic".into(),
                        kind: DeviceKind::AudioInput,
                    },
                    TrackInfo {
                        label: "Cam".into(),
                        kind: DeviceKind::VideoInput,
                    },
                ]
            }
            fn video_size(&self) -> Option<(u32, u32)> {
                None
            }
            fn latest_frame(&self) -> Option<CameraFrame> {
                None
            }
            fn stop(&mut self) {}
        }

        assert_eq!(Fixed.video_track_label().as_deref(), Some("Cam"));
    }
}
