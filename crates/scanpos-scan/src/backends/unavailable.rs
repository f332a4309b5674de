//! Device backend for builds without camera support.
//!
//! Every request fails with "not found", so scanning reports a missing camera
//! and the cashier falls back to manual entry.

use std::sync::Arc;

use tokio::sync::watch;

use crate::device::{MediaDevices, MediaStream, PermissionWatch, TrackState, VideoConstraints};
use crate::error::DeviceError;
use crate::frame::Frame;

/// A platform with no camera.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDevices;

/// Stream type of [`UnavailableDevices`]; it can never be constructed.
#[derive(Debug)]
pub enum NoStream {}

impl MediaStream for NoStream {
    fn id(&self) -> &str {
        match *self {}
    }

    fn live_track_count(&self) -> usize {
        match *self {}
    }

    fn stop_tracks(&self) {
        match *self {}
    }

    fn track_state(&self) -> watch::Receiver<TrackState> {
        match *self {}
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        match *self {}
    }
}

impl MediaDevices for UnavailableDevices {
    type Stream = NoStream;

    async fn get_user_media(&self, constraints: &VideoConstraints) -> Result<NoStream, DeviceError> {
        Err(DeviceError::not_found(format!(
            "camera support is not compiled in (requested {})",
            constraints
        )))
    }

    async fn query_permission(&self) -> Option<PermissionWatch> {
        None
    }
}
