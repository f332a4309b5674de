//! Native camera capture through `nokhwa`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Native Capture Thread                               │
//! │                                                                         │
//! │   get_user_media(constraints)                                           │
//! │        │ spawn                                                          │
//! │        ▼                                                                │
//! │   std::thread ── Camera::new + open_stream ──oneshot──► Ok(NativeStream)│
//! │        │                                                                │
//! │        └─ loop: frame() ► RGB ► luma Frame ► latest slot                │
//! │             stop flag set      ► stop_stream, exit                      │
//! │             repeated failures  ► track Ended (device lost)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `nokhwa::Camera` is not `Send`, so it lives entirely on its own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::device::{FacingMode, MediaDevices, MediaStream, PermissionWatch, TrackState, VideoConstraints};
use crate::error::DeviceError;
use crate::frame::Frame;

/// Consecutive capture failures after which the track counts as ended.
const MAX_CAPTURE_FAILURES: u32 = 30;

const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Cameras reachable through the operating system's video API.
#[derive(Debug, Clone, Copy)]
pub struct NokhwaDevices {
    rear_index: u32,
    front_index: Option<u32>,
}

impl NokhwaDevices {
    pub fn new(rear_index: u32, front_index: Option<u32>) -> Self {
        NokhwaDevices {
            rear_index,
            front_index,
        }
    }

    fn index_for(&self, facing: FacingMode) -> Result<u32, DeviceError> {
        match facing {
            FacingMode::Environment | FacingMode::Any => Ok(self.rear_index),
            FacingMode::User => self
                .front_index
                .ok_or_else(|| DeviceError::not_found("no front-facing camera configured")),
        }
    }
}

fn requested_format(constraints: &VideoConstraints) -> RequestedFormat<'static> {
    match (constraints.ideal_width, constraints.ideal_height) {
        (Some(w), Some(h)) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            Resolution::new(w, h),
            FrameFormat::MJPEG,
            constraints.ideal_frame_rate.unwrap_or(30),
        ))),
        _ => RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    }
}

fn open_camera(index: u32, constraints: &VideoConstraints) -> Result<Camera, DeviceError> {
    let mut camera = Camera::new(CameraIndex::Index(index), requested_format(constraints))
        .map_err(|e| DeviceError::classify(e.to_string()))?;

    let resolution = camera.resolution();
    let too_small = constraints.min_width.is_some_and(|w| resolution.width() < w)
        || constraints.min_height.is_some_and(|h| resolution.height() < h);
    if too_small {
        return Err(DeviceError::other(format!(
            "camera {} offers {}x{}, below the requested minimum",
            index,
            resolution.width(),
            resolution.height()
        )));
    }

    camera
        .open_stream()
        .map_err(|e| DeviceError::classify(e.to_string()))?;
    Ok(camera)
}

struct Shared {
    id: String,
    live: AtomicBool,
    stop: AtomicBool,
    track: watch::Sender<TrackState>,
    latest: Mutex<Option<Arc<Frame>>>,
}

impl Shared {
    fn end(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.track.send_replace(TrackState::Ended);
    }
}

fn capture_loop(mut camera: Camera, shared: Arc<Shared>) {
    let mut failures = 0u32;
    let mut sequence = 0u64;

    while !shared.stop.load(Ordering::SeqCst) {
        let captured = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbFormat>());
        match captured {
            Ok(image) => {
                failures = 0;
                sequence += 1;
                let (w, h) = (image.width(), image.height());
                let frame = Frame::from_rgb(&image.into_raw(), w, h, sequence);
                *shared.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(frame));
            }
            Err(e) => {
                failures += 1;
                debug!(stream = %shared.id, failures, error = %e, "Frame capture failed");
                if failures >= MAX_CAPTURE_FAILURES {
                    warn!(stream = %shared.id, "Camera stopped delivering frames");
                    break;
                }
                thread::sleep(CAPTURE_RETRY_DELAY);
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        debug!(stream = %shared.id, error = %e, "Failed to stop camera stream cleanly");
    }
    shared.end();
    debug!(stream = %shared.id, "Capture thread exited");
}

/// A running capture thread.
pub struct NativeStream {
    shared: Arc<Shared>,
}

impl MediaStream for NativeStream {
    fn id(&self) -> &str {
        &self.shared.id
    }

    fn live_track_count(&self) -> usize {
        usize::from(self.shared.live.load(Ordering::SeqCst))
    }

    fn stop_tracks(&self) {
        if !self.shared.stop.swap(true, Ordering::SeqCst) {
            self.shared.end();
        }
    }

    fn track_state(&self) -> watch::Receiver<TrackState> {
        self.shared.track.subscribe()
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        if !self.shared.live.load(Ordering::SeqCst) {
            return None;
        }
        self.shared
            .latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

impl MediaDevices for NokhwaDevices {
    type Stream = NativeStream;

    async fn get_user_media(&self, constraints: &VideoConstraints) -> Result<NativeStream, DeviceError> {
        let index = self.index_for(constraints.facing)?;
        let constraints = constraints.clone();
        let (setup_tx, setup_rx) = oneshot::channel();

        let (track, _) = watch::channel(TrackState::Live);
        let shared = Arc::new(Shared {
            id: format!("camera-{}-{}", index, uuid::Uuid::new_v4().simple()),
            live: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            track,
            latest: Mutex::new(None),
        });
        let thread_shared = Arc::clone(&shared);

        thread::Builder::new()
            .name(format!("camera-{}", index))
            .spawn(move || match open_camera(index, &constraints) {
                Ok(camera) => {
                    thread_shared.live.store(true, Ordering::SeqCst);
                    if setup_tx.send(Ok(())).is_err() {
                        // Requester gave up; release the device right away.
                        thread_shared.stop.store(true, Ordering::SeqCst);
                    }
                    capture_loop(camera, thread_shared);
                }
                Err(err) => {
                    let _ = setup_tx.send(Err(err));
                }
            })
            .map_err(|e| DeviceError::other(format!("failed to start capture thread: {}", e)))?;

        match setup_rx.await {
            Ok(Ok(())) => {
                info!(stream = %shared.id, index, "Native camera opened");
                Ok(NativeStream { shared })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DeviceError::other("capture thread exited during setup")),
        }
    }

    async fn query_permission(&self) -> Option<PermissionWatch> {
        None
    }
}
