// SPDX-License-Identifier: MPL-2.0

//! Widget session
//!
//! Ties device selection, the stream lifecycle, layout and snapshots
//! together. All state lives in [`CameraSession`]; the host shell is reached
//! only through the [`WidgetHost`] and [`PreferenceStore`] ports it was
//! constructed with.
//!
//! ```text
//! start ─► enumerate ─► reselect by label ─► acquire ─► metadata ─► layout ─► host resize
//!                              │                 │
//!                              └──── failure ────┴─► no camera
//! ```

use crate::backends::camera::{
    CameraFrame, CameraHost, CaptureDevice, DeviceRegistry, StreamController, StreamStatus,
};
use crate::constants::{ORIENTATION_PREFERENCE_KEY, SizeLabel};
use crate::errors::{CameraError, PhotoError};
use crate::geometry::{LayoutResult, Orientation, SourceAspect, compute_layout};
use crate::host::{ImageObject, PreferenceStore, WidgetHost};
use crate::pipelines::photo::{EncodedImage, PhotoPipeline};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What the widget is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    /// Not started yet
    #[default]
    Idle,
    /// A stream is live
    Streaming,
    /// No usable camera; the user can retry by re-opening the camera list
    NoCamera,
    /// The host has no camera support (terminal)
    Unavailable,
}

/// One row of the camera selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraEntry {
    pub label: String,
    pub selected: bool,
}

/// One row of the size selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeEntry {
    pub label: SizeLabel,
    /// `"M (640x360)"` once a layout is known, the bare label before
    pub text: String,
    pub selected: bool,
}

/// Explicit session state for one widget instance
pub struct CameraSession<C: CameraHost, P: PreferenceStore, W: WidgetHost> {
    host: Arc<C>,
    registry: DeviceRegistry,
    stream: StreamController<C>,
    preferences: P,
    widget: W,
    pipeline: PhotoPipeline,
    orientation: Orientation,
    size: SizeLabel,
    /// Device id to request on the next acquisition
    camera: Option<String>,
    /// Durable identity of the selected camera
    camera_label: Option<String>,
    /// Id the live stream was resolved to, when known
    streaming_id: Option<String>,
    display: DisplayState,
    playing: bool,
    frozen: Option<CameraFrame>,
    source: SourceAspect,
}

impl<C: CameraHost, P: PreferenceStore, W: WidgetHost> CameraSession<C, P, W> {
    pub fn new(host: Arc<C>, preferences: P, widget: W) -> Self {
        let stream = StreamController::new(Arc::clone(&host));
        Self {
            host,
            registry: DeviceRegistry::new(),
            stream,
            preferences,
            widget,
            pipeline: PhotoPipeline::new(),
            orientation: Orientation::default(),
            size: SizeLabel::default(),
            camera: None,
            camera_label: None,
            streaming_id: None,
            display: DisplayState::Idle,
            playing: true,
            frozen: None,
            source: SourceAspect::default(),
        }
    }

    /// Use a custom snapshot pipeline
    pub fn with_pipeline(mut self, pipeline: PhotoPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Start with a different size preset
    pub fn with_size(mut self, size: SizeLabel) -> Self {
        self.size = size;
        self
    }

    /// Override the resolution hint sent with every acquisition
    pub fn with_ideal_resolution(mut self, width: u32, height: u32) -> Self {
        let stream = StreamController::new(Arc::clone(&self.host));
        self.stream = stream.with_ideal_resolution(width, height);
        self
    }

    /// Bring the widget up: restore orientation, enumerate, acquire
    pub async fn start(&mut self) -> Result<StreamStatus, CameraError> {
        if !self.host.is_available() {
            error!("Camera API is not available on this host");
            self.display = DisplayState::Unavailable;
            return Err(CameraError::Unavailable);
        }

        self.orientation = match self.preferences.preference(ORIENTATION_PREFERENCE_KEY).await {
            Some(value) => Orientation::from_preference(&value),
            None => Orientation::default(),
        };
        info!(orientation = %self.orientation, "Restored orientation");

        self.refresh_devices().await?;
        if self.stream.is_active() {
            return self.active_status();
        }
        self.acquire().await
    }

    /// Re-enumerate and re-apply the remembered selection by label
    ///
    /// Re-acquires when nothing is streaming or the selected camera came back
    /// under a different id. A vanished camera or an empty list moves the
    /// widget to the "no camera" state.
    pub async fn refresh_devices(&mut self) -> Result<Option<CaptureDevice>, CameraError> {
        let result = self
            .registry
            .refresh(&*self.host, self.camera_label.as_deref())
            .await
            .map(|device| device.cloned());

        match result {
            Ok(Some(device)) => {
                self.camera = Some(device.id.clone());
                let moved = self.streaming_id.as_deref() != Some(device.id.as_str());
                if !self.stream.is_active() || moved {
                    debug!(label = %device.label, id = %device.id, "Re-acquiring selected camera");
                    self.acquire().await?;
                }
                Ok(Some(device))
            }
            Ok(None) => {
                if !self.stream.is_active() && self.display != DisplayState::Idle {
                    self.acquire().await?;
                }
                Ok(None)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Switch to the camera with `label`
    pub async fn select_camera(&mut self, label: &str) -> Result<StreamStatus, CameraError> {
        let Some(device) = self.registry.select_by_label(label) else {
            warn!(label, "Selected camera is not in the list");
            return Err(CameraError::DeviceVanished(label.to_string()));
        };
        info!(label, id = %device.id, "Camera selected");
        self.camera = Some(device.id.clone());
        self.acquire().await
    }

    /// Acquire a stream for the current selection (or the host default)
    pub async fn acquire(&mut self) -> Result<StreamStatus, CameraError> {
        match self.stream.acquire(self.camera.as_deref()).await {
            Ok(status) => {
                self.commit(&status);
                Ok(status)
            }
            Err(CameraError::Superseded) => Err(CameraError::Superseded),
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    fn commit(&mut self, status: &StreamStatus) {
        match self.listed_device(status) {
            Some(device) => {
                self.camera_label = Some(device.label);
                self.streaming_id = Some(device.id);
            }
            None => {
                self.camera_label = Some(status.label.clone()).filter(|l| !l.is_empty());
                self.streaming_id = status.requested_id.clone();
            }
        }
        self.display = DisplayState::Streaming;
        self.playing = true;
        self.frozen = None;
        self.source = SourceAspect::default();
        info!(label = ?self.camera_label, "Streaming");
        self.poll_metadata();
    }

    /// Registry entry the granted stream belongs to
    ///
    /// Unnamed tracks are listed under a placeholder, so fall back to the
    /// requested id, or to the first camera when the host picked the default.
    fn listed_device(&mut self, status: &StreamStatus) -> Option<CaptureDevice> {
        if let Some(device) = self.registry.select_by_label(&status.label) {
            return Some(device.clone());
        }
        match status.requested_id.as_deref() {
            Some(id) => self.registry.select_by_id(id).cloned(),
            None => self.registry.select_first().cloned(),
        }
    }

    fn active_status(&self) -> Result<StreamStatus, CameraError> {
        let label = self.stream.label().ok_or(CameraError::NoCameraFound)?;
        Ok(StreamStatus {
            generation: self.stream.generation(),
            label,
            requested_id: self.camera.clone(),
            video_size: self.stream.video_size(),
        })
    }

    /// Fall back to the "no camera" state (or "unavailable" for a host
    /// without camera support)
    pub fn handle_error(&mut self, err: &CameraError) {
        self.stream.release();
        self.camera = None;
        self.camera_label = None;
        self.streaming_id = None;
        self.registry.clear_selection();
        self.playing = true;
        self.frozen = None;
        self.source = SourceAspect::default();
        self.display = if err.is_recoverable() {
            DisplayState::NoCamera
        } else {
            DisplayState::Unavailable
        };
        warn!(error = %err, state = ?self.display, "Camera session reset");
    }

    /// Stop the stream on shutdown
    pub fn stop(&mut self) {
        self.stream.release();
        self.streaming_id = None;
        self.display = DisplayState::Idle;
    }

    /// Pick up a changed stream resolution
    ///
    /// Returns the new layout when the resolution changed; the host is asked
    /// to resize to it.
    pub fn poll_metadata(&mut self) -> Option<LayoutResult> {
        let (width, height) = self.stream.video_size().unwrap_or((0, 0));
        let source = SourceAspect::new(width, height);
        if source == self.source {
            return None;
        }
        debug!(width, height, "Video metadata changed");
        self.source = source;
        self.on_metadata()
    }

    /// Recompute layout after a metadata change and resize the host
    pub fn on_metadata(&mut self) -> Option<LayoutResult> {
        let layout = self.layout()?;
        self.request_resize(&layout);
        Some(layout)
    }

    /// Recompute layout after the host viewport changed
    pub fn on_viewport_resize(&self) -> Option<LayoutResult> {
        self.layout()
    }

    fn request_resize(&self, layout: &LayoutResult) {
        let (width, height) = layout.window_size();
        debug!(width, height, "Requesting host resize");
        self.widget.resize(width, height);
    }

    /// Layout for the current orientation, source and viewport
    pub fn layout(&self) -> Option<LayoutResult> {
        compute_layout(self.orientation, self.source, self.widget.viewport())
    }

    /// Rotate a quarter turn counter-clockwise
    pub async fn rotate_left(&mut self) -> Option<LayoutResult> {
        self.set_orientation(self.orientation.rotated_left()).await
    }

    /// Rotate a quarter turn clockwise
    pub async fn rotate_right(&mut self) -> Option<LayoutResult> {
        self.set_orientation(self.orientation.rotated_right()).await
    }

    /// Apply and persist an orientation, then relayout and resize the host
    pub async fn set_orientation(&mut self, orientation: Orientation) -> Option<LayoutResult> {
        self.orientation = orientation;
        let value = orientation.quarter_turns().to_string();
        match self
            .preferences
            .set_preference(ORIENTATION_PREFERENCE_KEY, value)
            .await
        {
            Ok(()) => debug!(orientation = %orientation, "Orientation saved"),
            Err(e) => warn!(error = %e, "Failed to save orientation"),
        }

        let layout = self.layout()?;
        self.request_resize(&layout);
        Some(layout)
    }

    pub fn select_size(&mut self, size: SizeLabel) {
        info!(size = %size, "Snapshot size selected");
        self.size = size;
    }

    /// Freeze the preview on the current frame
    pub fn pause(&mut self) {
        if self.display != DisplayState::Streaming || !self.playing {
            return;
        }
        self.frozen = self.stream.latest_frame();
        self.playing = false;
        debug!(has_frame = self.frozen.is_some(), "Preview paused");
    }

    /// Resume the live preview
    pub fn play(&mut self) {
        self.frozen = None;
        self.playing = true;
        debug!("Preview resumed");
    }

    pub fn toggle_playback(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Frame the preview should show: the frozen one while paused
    pub fn preview_frame(&self) -> Option<CameraFrame> {
        if self.playing {
            self.stream.latest_frame()
        } else {
            self.frozen.clone()
        }
    }

    /// Capture the displayed frame at the selected size and hand it to the host
    ///
    /// Returns `Ok(None)` while the stream resolution is still unknown.
    pub async fn snapshot(&mut self) -> Result<Option<EncodedImage>, PhotoError> {
        if !self.source.is_ready() {
            debug!("Snapshot ignored, metadata not ready");
            return Ok(None);
        }
        let frame = self.preview_frame().ok_or(PhotoError::NoFrameAvailable)?;

        let encoded = self
            .pipeline
            .snapshot(frame, self.orientation, self.size.option())
            .await?;
        self.widget
            .add_object(ImageObject::at_origin(encoded.to_data_uri()));
        info!(
            width = encoded.width,
            height = encoded.height,
            "Snapshot delivered to host"
        );
        Ok(Some(encoded))
    }

    /// Camera list rows in host order
    pub fn camera_entries(&self) -> Vec<CameraEntry> {
        let selected = self.registry.selected().map(|d| d.label.as_str());
        self.registry
            .devices()
            .iter()
            .map(|device| CameraEntry {
                label: device.label.clone(),
                selected: selected == Some(device.label.as_str()),
            })
            .collect()
    }

    /// Size list rows, with pixel hints once a layout is known
    pub fn size_entries(&self) -> Vec<SizeEntry> {
        let layout = self.layout();
        SizeLabel::ALL
            .into_iter()
            .map(|label| SizeEntry {
                label,
                text: layout
                    .as_ref()
                    .and_then(|l| l.hint(label))
                    .map(|hint| hint.to_string())
                    .unwrap_or_else(|| label.to_string()),
                selected: label == self.size,
            })
            .collect()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn size(&self) -> SizeLabel {
        self.size
    }

    pub fn display_state(&self) -> DisplayState {
        self.display
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn source_aspect(&self) -> SourceAspect {
        self.source
    }

    /// Label of the selected camera, if any
    pub fn selected_label(&self) -> Option<&str> {
        self.camera_label.as_deref()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn stream(&self) -> &StreamController<C> {
        &self.stream
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }
}
