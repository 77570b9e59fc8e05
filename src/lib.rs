// SPDX-License-Identifier: MPL-2.0

//! Board Camera - an orientation-aware camera widget
//!
//! This library provides the core of a camera widget for whiteboard-style
//! hosts: device discovery and stream lifecycle, layout of a rotated live
//! preview, and rotated snapshots at fixed size presets.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera host abstraction and the V4L2 implementation
//! - [`geometry`]: Pure layout and snapshot-size computation
//! - [`pipelines`]: Rotated snapshot rendering and encoding
//! - [`session`]: Explicit widget session tying everything together
//! - [`host`]: Capabilities the embedding shell provides
//! - [`config`]: User configuration handling
//! - [`storage`]: File-backed preferences and image emission
//! - [`terminal`]: Interactive terminal host
//!
//! # Example
//!
//! ```ignore
//! let host = std::sync::Arc::new(board_camera::backends::camera::get_default_host());
//! let mut session = CameraSession::new(host, MemoryPreferenceStore::new(), sink);
//! session.start().await?;
//! session.rotate_right().await;
//! session.snapshot().await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod geometry;
pub mod host;
pub mod pipelines;
pub mod session;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use constants::{SizeLabel, SizeOption};
pub use errors::{AppError, AppResult, CameraError, PhotoError};
pub use geometry::{LayoutResult, Orientation, SourceAspect, ViewportSize, compute_layout};
pub use host::{ImageObject, PreferenceStore, WidgetHost};
pub use session::{CameraSession, DisplayState};
