// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera host
//!
//! Implements [`CameraHost`] directly on top of the kernel's video4linux
//! interface:
//!
//! - Enumeration lists `/dev/video*` nodes. A node counts as a video input
//!   when it advertises `VIDEO_CAPTURE` and has at least one capture format
//!   (UVC metadata nodes are reported as [`DeviceKind::Other`]).
//! - The device id is the node path, which is not stable across replugs;
//!   the label is the V4L2 card name.
//! - Streams request MJPG (falling back to YUYV/UYVY) at the ideal
//!   resolution and accept whatever the driver grants. A capture thread
//!   decodes every buffer to RGB and keeps the latest frame.

use super::CameraHost;
use super::format_converters::{Packed422, mjpeg_to_rgb, packed_422_to_rgb};
use super::types::*;
use crate::constants::V4L2_BUFFER_COUNT;
use image::RgbImage;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";

/// Preferred pixel formats, best first
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"MJPG", b"YUYV", b"UYVY"];

/// Camera host backed by V4L2 device nodes
#[derive(Debug, Clone, Default)]
pub struct V4l2Host;

impl V4l2Host {
    pub fn new() -> Self {
        Self
    }
}

impl CameraHost for V4l2Host {
    type Stream = V4l2Stream;

    fn is_available(&self) -> bool {
        Path::new(SYSFS_VIDEO4LINUX).exists()
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "video4linux subsystem not present".to_string(),
            ));
        }

        tokio::task::spawn_blocking(enumerate_nodes)
            .await
            .map_err(|e| BackendError::Other(format!("Enumeration task error: {}", e)))
    }

    async fn get_user_media(&self, constraints: StreamConstraints) -> BackendResult<V4l2Stream> {
        tokio::task::spawn_blocking(move || open_stream(&constraints))
            .await
            .map_err(|e| BackendError::Other(format!("Capture task error: {}", e)))?
    }
}

/// List video nodes in index order
fn enumerate_nodes() -> Vec<MediaDeviceInfo> {
    let mut nodes = v4l::context::enum_devices();
    nodes.sort_by_key(|node| node.index());

    nodes
        .iter()
        .map(|node| {
            let path = node.path().to_string_lossy().to_string();
            let (label, kind) = probe_node(&path)
                .unwrap_or_else(|| (node.name().unwrap_or_default(), DeviceKind::Other));
            debug!(path = %path, label = %label, kind = %kind, "Found V4L2 node");
            MediaDeviceInfo::new(path, label, kind)
        })
        .collect()
}

/// Card name and kind of one node, `None` if it cannot be opened
fn probe_node(path: &str) -> Option<(String, DeviceKind)> {
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;

    let has_capture_formats = dev
        .enum_formats()
        .map(|formats| !formats.is_empty())
        .unwrap_or(false);

    let kind = if caps.capabilities.contains(Flags::VIDEO_CAPTURE) && has_capture_formats {
        DeviceKind::VideoInput
    } else {
        DeviceKind::Other
    };

    Some((caps.card, kind))
}

fn first_capture_node() -> Option<String> {
    enumerate_nodes()
        .into_iter()
        .find(|info| info.kind == DeviceKind::VideoInput)
        .map(|info| info.device_id)
}

fn select_fourcc(dev: &Device, path: &str) -> BackendResult<FourCC> {
    let formats = dev
        .enum_formats()
        .map_err(|e| BackendError::from_io(path, &e))?;

    PREFERRED_FOURCCS
        .iter()
        .map(|code| FourCC::new(code))
        .find(|fourcc| formats.iter().any(|f| f.fourcc == *fourcc))
        .ok_or_else(|| {
            let offered: Vec<String> = formats.iter().map(|f| f.fourcc.to_string()).collect();
            BackendError::FormatNotSupported(format!(
                "{} offers only [{}]",
                path,
                offered.join(", ")
            ))
        })
}

/// Open, configure and start streaming from a device
fn open_stream(constraints: &StreamConstraints) -> BackendResult<V4l2Stream> {
    let path = match &constraints.device_id {
        Some(id) => id.clone(),
        None => first_capture_node()
            .ok_or_else(|| BackendError::DeviceNotFound("no capture devices".to_string()))?,
    };

    info!(path = %path, "Opening V4L2 device");
    let dev = Device::with_path(&path).map_err(|e| BackendError::from_io(&path, &e))?;
    let caps = dev
        .query_caps()
        .map_err(|e| BackendError::from_io(&path, &e))?;

    let fourcc = select_fourcc(&dev, &path)?;
    let requested = Format::new(constraints.ideal_width, constraints.ideal_height, fourcc);
    let granted = dev
        .set_format(&requested)
        .map_err(|e| BackendError::from_io(&path, &e))?;

    info!(
        path = %path,
        card = %caps.card,
        requested = format!("{}x{}", requested.width, requested.height),
        granted = format!("{}x{}", granted.width, granted.height),
        fourcc = %granted.fourcc,
        "Configured V4L2 format"
    );

    let decoder = FrameDecoder::for_format(&granted)?;
    let shared = Arc::new(Mutex::new(SharedFrame::default()));
    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = mpsc::channel();

    let worker = {
        let shared = Arc::clone(&shared);
        let running = Arc::clone(&running);
        let path = path.clone();
        thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || capture_loop(dev, path, decoder, shared, running, ready_tx))
            .map_err(|e| BackendError::IoError(format!("Failed to spawn capture thread: {}", e)))?
    };

    match ready_rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = worker.join();
            return Err(e);
        }
        Err(_) => {
            let _ = worker.join();
            return Err(BackendError::Other("Capture thread exited early".to_string()));
        }
    }

    Ok(V4l2Stream {
        label: caps.card,
        shared,
        running,
        worker: Some(worker),
    })
}

/// How raw buffers of the granted format become RGB
#[derive(Debug, Clone, Copy)]
enum FrameDecoder {
    Mjpeg,
    Packed {
        width: u32,
        height: u32,
        stride: u32,
        order: Packed422,
    },
}

impl FrameDecoder {
    fn for_format(format: &Format) -> BackendResult<Self> {
        let packed = |order| FrameDecoder::Packed {
            width: format.width,
            height: format.height,
            stride: format.stride,
            order,
        };

        match &format.fourcc.repr {
            b"MJPG" => Ok(FrameDecoder::Mjpeg),
            b"YUYV" => Ok(packed(Packed422::Yuyv)),
            b"UYVY" => Ok(packed(Packed422::Uyvy)),
            _ => Err(BackendError::FormatNotSupported(format!(
                "driver granted unsupported format {}",
                format.fourcc
            ))),
        }
    }

    fn decode(&self, data: &[u8]) -> BackendResult<RgbImage> {
        match *self {
            FrameDecoder::Mjpeg => mjpeg_to_rgb(data),
            FrameDecoder::Packed {
                width,
                height,
                stride,
                order,
            } => packed_422_to_rgb(data, width, height, stride, order),
        }
    }
}

#[derive(Default)]
struct SharedFrame {
    latest: Option<CameraFrame>,
    size: Option<(u32, u32)>,
}

fn capture_loop(
    dev: Device,
    path: String,
    decoder: FrameDecoder,
    shared: Arc<Mutex<SharedFrame>>,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<BackendResult<()>>,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, V4L2_BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_io(&path, &e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    info!(path = %path, "V4L2 capture stream started");

    while running.load(Ordering::SeqCst) {
        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) => {
                error!(path = %path, error = %e, "V4L2 capture failed, stopping stream");
                break;
            }
        };

        let used = meta.bytesused as usize;
        let payload = if used > 0 && used <= buf.len() {
            &buf[..used]
        } else {
            buf
        };

        let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        match decoder.decode(payload) {
            Ok(image) => {
                let frame = CameraFrame::from_rgb(image);
                let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.size.is_none() {
                    info!(width = frame.width, height = frame.height, "Video metadata loaded");
                }
                slot.size = Some((frame.width, frame.height));
                slot.latest = Some(frame);
            }
            Err(e) => {
                if frame_num % 30 == 0 {
                    warn!(frame = frame_num, error = %e, "Dropping undecodable frame");
                }
            }
        }
    }

    info!(path = %path, "V4L2 capture stream stopped");
}

/// A live V4L2 capture stream
pub struct V4l2Stream {
    label: String,
    shared: Arc<Mutex<SharedFrame>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MediaStream for V4l2Stream {
    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            label: self.label.clone(),
            kind: DeviceKind::VideoInput,
        }]
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .size
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            // The loop notices the flag after its current buffer, so this
            // blocks for up to one frame interval. Dropping the mmap stream
            // turns streaming off and closes the node.
            if worker.join().is_err() {
                error!(label = %self.label, "Capture thread panicked");
            }
            debug!(label = %self.label, "V4L2 stream stopped");
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for V4l2Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Stream")
            .field("label", &self.label)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}
