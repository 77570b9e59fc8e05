// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the stream controller

mod common;

use board_camera::CameraError;
use board_camera::backends::camera::{BackendError, StreamController};
use common::FakeHost;
use std::sync::Arc;

fn cameras() -> Arc<FakeHost> {
    FakeHost::with_cameras(&[("A", "Cam1"), ("B", "Cam2")])
}

#[tokio::test]
async fn test_new_acquisition_stops_previous_stream() {
    let host = cameras();
    let controller = StreamController::new(Arc::clone(&host));

    let first = controller.acquire(Some("A")).await.unwrap();
    assert_eq!(first.label, "Cam1");
    assert_eq!(host.live_streams(), 1);

    let second = controller.acquire(Some("B")).await.unwrap();
    assert_eq!(second.label, "Cam2");
    assert_eq!(host.live_streams(), 1, "exactly one stream may run");
    assert_eq!(host.stopped_streams(), 1);
    assert_eq!(controller.label().as_deref(), Some("Cam2"));

    // The previous stream was gone before the host saw the next request
    assert_eq!(host.live_at_request(), vec![0, 0]);
}

#[tokio::test]
async fn test_switching_stops_off_the_runtime_thread() {
    let host = cameras();
    let controller = StreamController::new(Arc::clone(&host));

    controller.acquire(Some("A")).await.unwrap();
    controller.acquire(Some("B")).await.unwrap();

    let stops = host.stop_threads();
    assert_eq!(stops.len(), 1);
    assert_ne!(stops[0], std::thread::current().id());
}

#[tokio::test]
async fn test_default_device_and_resolution_hint() {
    let host = cameras();
    let controller = StreamController::new(Arc::clone(&host));

    let status = controller.acquire(None).await.unwrap();
    assert_eq!(status.label, "Cam1");
    assert_eq!(status.requested_id, None);
    assert_eq!(status.video_size, Some((1920, 1080)));

    let request = &host.requests()[0];
    assert_eq!(request.device_id, None);
    assert_eq!((request.ideal_width, request.ideal_height), (1920, 1080));
}

#[tokio::test]
async fn test_granted_resolution_may_differ_from_hint() {
    let host = cameras();
    host.set_feed(640, 480, [0, 0, 0]);
    let controller = StreamController::new(Arc::clone(&host)).with_ideal_resolution(1280, 720);

    let status = controller.acquire(None).await.unwrap();
    assert_eq!(status.video_size, Some((640, 480)));
    assert_eq!(host.requests()[0].ideal_width, 1280);
}

#[tokio::test]
async fn test_stale_acquisition_is_discarded() {
    let host = cameras();
    let controller = Arc::new(StreamController::new(Arc::clone(&host)));

    // The first request hangs in the host
    let gate = host.gate_next();
    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(Some("A")).await })
    };
    host.wait_for_requests(1).await;

    // A newer request completes first
    let fast = controller.acquire(Some("B")).await.unwrap();
    assert_eq!(fast.label, "Cam2");

    // The late grant must not overwrite the newer selection
    gate.send(()).unwrap();
    let late = slow.await.unwrap();
    assert!(matches!(late, Err(CameraError::Superseded)));

    assert_eq!(controller.label().as_deref(), Some("Cam2"));
    assert_eq!(host.live_streams(), 1);
    assert_eq!(host.stopped_streams(), 1, "stale stream stopped on arrival");
}

#[tokio::test]
async fn test_release_invalidates_in_flight_acquisition() {
    let host = cameras();
    let controller = Arc::new(StreamController::new(Arc::clone(&host)));

    let gate = host.gate_next();
    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(None).await })
    };
    host.wait_for_requests(1).await;

    controller.release();
    gate.send(()).unwrap();

    assert!(matches!(pending.await.unwrap(), Err(CameraError::Superseded)));
    assert!(!controller.is_active());
    assert_eq!(host.live_streams(), 0);
}

#[tokio::test]
async fn test_failure_clears_active_stream() {
    let host = cameras();
    let controller = StreamController::new(Arc::clone(&host));
    controller.acquire(Some("A")).await.unwrap();

    host.fail_next(BackendError::PermissionDenied("A".into()));
    let err = controller.acquire(Some("A")).await.unwrap_err();

    assert!(matches!(
        err,
        CameraError::AcquisitionFailed(BackendError::PermissionDenied(_))
    ));
    assert!(!controller.is_active());
    assert_eq!(controller.label(), None);
    assert_eq!(host.live_streams(), 0);
}

#[tokio::test]
async fn test_unknown_device_fails() {
    let host = cameras();
    let controller = StreamController::new(Arc::clone(&host));

    let err = controller.acquire(Some("gone")).await.unwrap_err();
    assert!(matches!(
        err,
        CameraError::AcquisitionFailed(BackendError::DeviceNotFound(_))
    ));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_missing_camera_api_is_unavailable() {
    let host = cameras();
    host.fail_next(BackendError::NotAvailable("no API".into()));
    let controller = StreamController::new(Arc::clone(&host));

    let err = controller.acquire(None).await.unwrap_err();
    assert!(matches!(err, CameraError::Unavailable));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_drop_stops_stream() {
    let host = cameras();
    {
        let controller = StreamController::new(Arc::clone(&host));
        controller.acquire(None).await.unwrap();
        assert_eq!(host.live_streams(), 1);
    }
    assert_eq!(host.live_streams(), 0);
}
