//! # Permission Gate
//!
//! Tracks the camera permission state and triggers the platform prompt.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Permission Flow                                   │
//! │                                                                         │
//! │   check_permission()                 request_permission()               │
//! │   ──────────────────                 ────────────────────               │
//! │   query API present?                 get_user_media(probe)              │
//! │     ├ yes ► adopt state, follow        ├ ok      ► stop tracks,        │
//! │     │       later changes              │           Granted             │
//! │     └ no  ► Unknown                    ├ denied  ► Denied              │
//! │             (settled value kept)       ├ missing ► NoDevice            │
//! │                                        └ other   ► Failed              │
//! │                                                                         │
//! │   The state lives in a watch channel; anyone may subscribe.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use scanpos_core::CameraPermissionState;

use crate::device::{MediaDevices, MediaStream, VideoConstraints};
use crate::error::{DeviceFailure, ScanError};

/// Result of an explicit permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRequest {
    Granted,
    Denied,
    /// The prompt could not be shown because no camera exists.
    NoDevice,
    Failed(String),
}

impl PermissionRequest {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionRequest::Granted)
    }

    /// The session error this outcome maps to, if it is a failure.
    pub fn into_error(self) -> Option<ScanError> {
        match self {
            PermissionRequest::Granted => None,
            PermissionRequest::Denied => Some(ScanError::PermissionDenied),
            PermissionRequest::NoDevice => Some(ScanError::DeviceUnavailable {
                kind: DeviceFailure::NotFound,
                message: "no camera available for the permission prompt".into(),
            }),
            PermissionRequest::Failed(message) => Some(ScanError::DeviceUnavailable {
                kind: DeviceFailure::Other,
                message,
            }),
        }
    }
}

/// Owns the permission state for one device backend.
pub struct PermissionGate<M: MediaDevices> {
    devices: Arc<M>,
    state: Arc<watch::Sender<CameraPermissionState>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl<M: MediaDevices> PermissionGate<M> {
    pub fn new(devices: Arc<M>) -> Self {
        let (tx, _rx) = watch::channel(CameraPermissionState::Unknown);
        PermissionGate {
            devices,
            state: Arc::new(tx),
            forwarder: Mutex::new(None),
        }
    }

    pub fn current(&self) -> CameraPermissionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraPermissionState> {
        self.state.subscribe()
    }

    /// Records an outcome learned elsewhere, e.g. a denied acquisition.
    pub fn record(&self, state: CameraPermissionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = %current, to = %state, "Camera permission changed");
            *current = state;
            true
        });
    }

    /// Queries the platform for the current state.
    ///
    /// When the platform exposes a query API, later changes it reports are
    /// followed automatically. Without one this returns `Unknown` and keeps
    /// any previously settled state.
    pub async fn check_permission(&self) -> CameraPermissionState {
        let Some(mut platform) = self.devices.query_permission().await else {
            debug!("Permission query unsupported on this platform");
            return CameraPermissionState::Unknown;
        };

        let observed = *platform.borrow_and_update();
        self.record(observed);

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while platform.changed().await.is_ok() {
                let next = *platform.borrow_and_update();
                state.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    info!(from = %current, to = %next, "Camera permission changed by platform");
                    *current = next;
                    true
                });
            }
        });

        let mut slot = self.forwarder.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }

        observed
    }

    /// Triggers the platform prompt by opening and immediately closing a
    /// probe stream.
    pub async fn request_permission(&self) -> PermissionRequest {
        let probe = VideoConstraints::permission_probe();
        debug!(constraints = %probe, "Requesting camera permission");

        match self.devices.get_user_media(&probe).await {
            Ok(stream) => {
                stream.stop_tracks();
                self.record(CameraPermissionState::Granted);
                info!("Camera permission granted");
                PermissionRequest::Granted
            }
            Err(err) => match err.kind {
                DeviceFailure::PermissionDenied => {
                    self.record(CameraPermissionState::Denied);
                    warn!(error = %err, "Camera permission denied");
                    PermissionRequest::Denied
                }
                DeviceFailure::NotFound => {
                    warn!(error = %err, "No camera available for permission prompt");
                    PermissionRequest::NoDevice
                }
                _ => {
                    warn!(error = %err, "Permission request failed");
                    PermissionRequest::Failed(err.message)
                }
            },
        }
    }
}

impl<M: MediaDevices> Drop for PermissionGate<M> {
    fn drop(&mut self) {
        let slot = self.forwarder.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
