// SPDX-License-Identifier: MPL-2.0

//! In-memory hosts shared by the integration tests

#![allow(dead_code)]

use board_camera::backends::camera::{
    BackendError, BackendResult, CameraFrame, CameraHost, DeviceKind, MediaDeviceInfo,
    MediaStream, StreamConstraints, TrackInfo,
};
use board_camera::{ImageObject, ViewportSize, WidgetHost};
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use tokio::sync::oneshot;

/// What every live stream of the fake host is currently delivering
#[derive(Debug, Default)]
pub struct Feed {
    pub size: Option<(u32, u32)>,
    pub frame: Option<CameraFrame>,
}

/// Camera host with a scripted device list
#[derive(Default)]
pub struct FakeHost {
    unavailable: bool,
    devices: Mutex<Vec<MediaDeviceInfo>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    failures: Mutex<VecDeque<BackendError>>,
    requests: Mutex<Vec<StreamConstraints>>,
    live_at_request: Mutex<Vec<usize>>,
    feed: Arc<Mutex<Feed>>,
    live: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    stop_threads: Arc<Mutex<Vec<ThreadId>>>,
    enumerations: AtomicUsize,
}

impl FakeHost {
    /// Host listing `cameras` as `(id, label)` video inputs
    pub fn with_cameras(cameras: &[(&str, &str)]) -> Arc<Self> {
        let host = Self::default();
        host.set_cameras(cameras);
        host.set_feed(1920, 1080, [200, 10, 10]);
        Arc::new(host)
    }

    /// Host without camera support
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            unavailable: true,
            ..Self::default()
        })
    }

    /// Replace the device list, keeping a microphone in front of it
    pub fn set_cameras(&self, cameras: &[(&str, &str)]) {
        let mut devices = vec![MediaDeviceInfo::new(
            "mic0",
            "Built-in Microphone",
            DeviceKind::AudioInput,
        )];
        devices.extend(
            cameras
                .iter()
                .map(|(id, label)| MediaDeviceInfo::video(*id, *label)),
        );
        *self.devices.lock().unwrap() = devices;
    }

    /// Deliver solid `color` frames at `width`x`height`
    pub fn set_feed(&self, width: u32, height: u32, color: [u8; 3]) {
        let frame = CameraFrame::from_rgb(RgbImage::from_pixel(width, height, Rgb(color)));
        let mut feed = self.feed.lock().unwrap();
        feed.size = Some((width, height));
        feed.frame = Some(frame);
    }

    /// Streams report no resolution and no frames yet
    pub fn clear_feed(&self) {
        *self.feed.lock().unwrap() = Feed::default();
    }

    /// Hold the next acquisition until the returned sender fires
    pub fn gate_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Fail the next acquisition with `error`
    pub fn fail_next(&self, error: BackendError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Constraints of every acquisition so far
    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.requests.lock().unwrap().clone()
    }

    /// Requested device ids, in order
    pub fn requested_ids(&self) -> Vec<Option<String>> {
        self.requests().into_iter().map(|c| c.device_id).collect()
    }

    /// Live stream count seen by each acquisition as it arrived
    pub fn live_at_request(&self) -> Vec<usize> {
        self.live_at_request.lock().unwrap().clone()
    }

    /// Threads that stopped streams, in order
    pub fn stop_threads(&self) -> Vec<ThreadId> {
        self.stop_threads.lock().unwrap().clone()
    }

    /// Streams granted and not yet stopped
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stopped_streams(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// Wait until `count` acquisitions have reached the host
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl CameraHost for FakeHost {
    type Stream = FakeStream;

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        if self.unavailable {
            return Err(BackendError::NotAvailable("no camera API".into()));
        }
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn get_user_media(&self, constraints: StreamConstraints) -> BackendResult<FakeStream> {
        self.live_at_request
            .lock()
            .unwrap()
            .push(self.live.load(Ordering::SeqCst));
        self.requests.lock().unwrap().push(constraints.clone());

        let gate = self.gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let label = {
            let devices = self.devices.lock().unwrap();
            let mut cameras = devices.iter().filter(|d| d.kind == DeviceKind::VideoInput);
            let device = match constraints.device_id.as_deref() {
                Some(id) => cameras.find(|d| d.device_id == id),
                None => cameras.next(),
            };
            device
                .map(|d| d.label.clone())
                .ok_or_else(|| BackendError::DeviceNotFound(format!("{:?}", constraints.device_id)))?
        };

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeStream {
            label,
            feed: Arc::clone(&self.feed),
            live: Arc::clone(&self.live),
            stops: Arc::clone(&self.stops),
            stop_threads: Arc::clone(&self.stop_threads),
            stopped: false,
        })
    }
}

pub struct FakeStream {
    label: String,
    feed: Arc<Mutex<Feed>>,
    live: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    stop_threads: Arc<Mutex<Vec<ThreadId>>>,
    stopped: bool,
}

impl MediaStream for FakeStream {
    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            label: self.label.clone(),
            kind: DeviceKind::VideoInput,
        }]
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.feed.lock().unwrap().size
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        self.feed.lock().unwrap().frame.clone()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.stop_threads
                .lock()
                .unwrap()
                .push(std::thread::current().id());
        }
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Widget host recording resize requests and emitted images
pub struct RecordingWidget {
    viewport: Mutex<ViewportSize>,
    resizes: Mutex<Vec<(u32, u32)>>,
    objects: Mutex<Vec<ImageObject>>,
}

impl RecordingWidget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Mutex::new(ViewportSize::new(width, height)),
            resizes: Mutex::new(Vec::new()),
            objects: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the user resizing the window
    pub fn set_viewport(&self, width: u32, height: u32) {
        *self.viewport.lock().unwrap() = ViewportSize::new(width, height);
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.resizes.lock().unwrap().clone()
    }

    pub fn objects(&self) -> Vec<ImageObject> {
        self.objects.lock().unwrap().clone()
    }
}

impl WidgetHost for RecordingWidget {
    fn viewport(&self) -> ViewportSize {
        *self.viewport.lock().unwrap()
    }

    fn resize(&self, width: u32, height: u32) {
        self.resizes.lock().unwrap().push((width, height));
    }

    fn add_object(&self, object: ImageObject) {
        self.objects.lock().unwrap().push(object);
    }
}
