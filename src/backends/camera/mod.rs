// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The widget core never talks to hardware directly. It consumes a
//! [`CameraHost`] capability that can enumerate devices and grant streams,
//! and builds device selection and stream lifecycle on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CameraSession     │
//! └──────────┬──────────┘
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//! ┌──────────┐ ┌──────────────────┐
//! │ Device   │ │ StreamController │  ← stop-then-replace, generations
//! │ Registry │ └────────┬─────────┘
//! └────┬─────┘          │
//!      └───────┬────────┘
//!              ▼
//! ┌─────────────────────┐
//! │  CameraHost trait   │  ← enumeration + stream acquisition
//! └──────────┬──────────┘
//!            ▼
//!        ┌──────┐
//!        │ V4L2 │  ← Concrete implementation
//!        └──────┘
//! ```

pub mod format_converters;
pub mod registry;
pub mod stream;
pub mod types;
pub mod v4l2;

pub use registry::DeviceRegistry;
pub use stream::{StreamController, StreamStatus};
pub use types::*;

use std::future::Future;

/// Host capability for camera access
///
/// Both calls may suspend for an unbounded time (permission prompts, slow
/// drivers) and must not block the caller's executor.
pub trait CameraHost: Send + Sync + 'static {
    /// Stream type granted by this host
    type Stream: MediaStream + 'static;

    /// Check if the host supports cameras at all
    fn is_available(&self) -> bool;

    /// List every media device the host knows about, in host order
    fn enumerate_devices(
        &self,
    ) -> impl Future<Output = BackendResult<Vec<MediaDeviceInfo>>> + Send;

    /// Request a stream matching `constraints`
    fn get_user_media(
        &self,
        constraints: StreamConstraints,
    ) -> impl Future<Output = BackendResult<Self::Stream>> + Send;
}

/// Get the default host for this platform
pub fn get_default_host() -> v4l2::V4l2Host {
    v4l2::V4l2Host::new()
}
