// SPDX-License-Identifier: GPL-3.0-only

//! Capture stream lifecycle
//!
//! The controller owns at most one live stream. Every acquisition first stops
//! and releases the previous stream, then asks the host for a new one.
//!
//! Acquisitions can overlap (a user clicking through cameras faster than the
//! driver opens them). Each request takes a ticket from a monotonic
//! generation counter; when a grant lands the controller commits it only if
//! no newer request has started since. Stale grants are stopped on arrival,
//! so the last request always wins and nothing is left running.

use super::CameraHost;
use super::types::{BackendResult, CameraFrame, MediaStream, StreamConstraints};
use crate::constants::{IDEAL_CAPTURE_HEIGHT, IDEAL_CAPTURE_WIDTH};
use crate::errors::CameraError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Summary of a committed acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStatus {
    /// Generation ticket of the acquisition
    pub generation: u64,
    /// Label of the granted video track
    pub label: String,
    /// Device id that was requested, if any
    pub requested_id: Option<String>,
    /// Resolution reported at grant time, if already known
    pub video_size: Option<(u32, u32)>,
}

struct StreamState<S> {
    active: Option<S>,
    label: Option<String>,
}

impl<S: MediaStream> StreamState<S> {
    fn stop_active(&mut self) -> bool {
        self.label = None;
        match self.active.take() {
            Some(mut stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }
}

/// Stop `stream` on the blocking pool
///
/// Stopping can join a capture thread, which takes up to one frame interval
/// and longer on a stalled driver.
async fn stop_off_runtime<S: MediaStream + 'static>(mut stream: S) {
    if let Err(e) = tokio::task::spawn_blocking(move || stream.stop()).await {
        warn!(error = %e, "Stopping camera stream failed");
    }
}

/// Owner of the single active capture stream
pub struct StreamController<H: CameraHost> {
    host: Arc<H>,
    state: Mutex<StreamState<H::Stream>>,
    generation: AtomicU64,
    ideal_width: u32,
    ideal_height: u32,
}

impl<H: CameraHost> StreamController<H> {
    /// Create a controller requesting the default 1920x1080 hint
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            state: Mutex::new(StreamState {
                active: None,
                label: None,
            }),
            generation: AtomicU64::new(0),
            ideal_width: IDEAL_CAPTURE_WIDTH,
            ideal_height: IDEAL_CAPTURE_HEIGHT,
        }
    }

    /// Override the resolution hint sent with every request
    pub fn with_ideal_resolution(mut self, width: u32, height: u32) -> Self {
        self.ideal_width = width;
        self.ideal_height = height;
        self
    }

    fn lock(&self) -> MutexGuard<'_, StreamState<H::Stream>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire a stream, preferring `device_id` when given
    ///
    /// Returns `CameraError::Superseded` when a newer acquisition (or a
    /// [`release`](Self::release)) started while this one was in flight; the
    /// late stream is stopped and state is left to the newer request.
    pub async fn acquire(&self, device_id: Option<&str>) -> Result<StreamStatus, CameraError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = {
            let mut state = self.lock();
            state.label = None;
            state.active.take()
        };
        if let Some(previous) = previous {
            stop_off_runtime(previous).await;
            debug!(generation, "Stopped previous stream before acquisition");
        }

        let constraints = StreamConstraints {
            device_id: device_id.map(str::to_string),
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
        };
        info!(generation, device = ?device_id, "Requesting camera stream");

        let result = self.host.get_user_media(constraints).await;

        let stale = {
            let mut state = self.lock();
            if self.generation.load(Ordering::SeqCst) == generation {
                return Self::commit(&mut state, generation, device_id, result);
            }
            result.ok()
        };

        warn!(generation, "Discarding stale stream acquisition");
        if let Some(stream) = stale {
            stop_off_runtime(stream).await;
        }
        Err(CameraError::Superseded)
    }

    fn commit(
        state: &mut StreamState<H::Stream>,
        generation: u64,
        device_id: Option<&str>,
        result: BackendResult<H::Stream>,
    ) -> Result<StreamStatus, CameraError> {
        match result {
            Ok(stream) => {
                // Nothing newer ran, but keep the one-stream rule airtight
                state.stop_active();

                let label = stream.video_track_label().unwrap_or_default();
                let video_size = stream.video_size();
                info!(generation, label = %label, size = ?video_size, "Camera stream granted");

                state.active = Some(stream);
                state.label = Some(label.clone());

                Ok(StreamStatus {
                    generation,
                    label,
                    requested_id: device_id.map(str::to_string),
                    video_size,
                })
            }
            Err(e) => {
                warn!(generation, error = %e, "Camera stream request failed");
                state.stop_active();
                Err(CameraError::from(e))
            }
        }
    }

    /// Stop the active stream and invalidate in-flight acquisitions
    ///
    /// Stops on the calling thread; [`acquire`](Self::acquire) moves its
    /// stops to the blocking pool instead.
    pub fn release(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.lock().stop_active() {
            info!("Camera stream released");
        }
    }

    /// Whether a stream is currently live
    pub fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Label of the active stream's video track
    pub fn label(&self) -> Option<String> {
        self.lock().label.clone()
    }

    /// Resolution of the active stream, once its metadata is known
    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.lock().active.as_ref().and_then(|s| s.video_size())
    }

    /// Latest frame of the active stream
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        self.lock().active.as_ref().and_then(|s| s.latest_frame())
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl<H: CameraHost> Drop for StreamController<H> {
    fn drop(&mut self) {
        self.lock().stop_active();
    }
}

impl<H: CameraHost> std::fmt::Debug for StreamController<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("StreamController")
            .field("generation", &self.generation())
            .field("active", &state.active.is_some())
            .field("label", &state.label)
            .finish()
    }
}
