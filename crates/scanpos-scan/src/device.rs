//! # Camera Device Seams
//!
//! Traits the platform implements so the scan engine can request a camera
//! stream and read frames from it, plus the constraint sets it asks with.
//!
//! ## Seam Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Platform Seams                                   │
//! │                                                                         │
//! │   MediaDevices                        MediaStream                       │
//! │   ────────────                        ───────────                       │
//! │   get_user_media(constraints) ──────► id()                              │
//! │   query_permission()                  live_track_count()                │
//! │     └► watch<CameraPermissionState>   stop_tracks()       (idempotent)  │
//! │                                       track_state() ► watch<TrackState> │
//! │                                       latest_frame() ► Arc<Frame>       │
//! │                                                                         │
//! │   Implementations: NativeCamera (nokhwa), NoCamera, MockDevices         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use scanpos_core::CameraPermissionState;

use crate::error::DeviceError;
use crate::frame::Frame;

// =============================================================================
// Constraints
// =============================================================================

/// Which camera a constraint set asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear camera on handhelds; the default capture device elsewhere.
    Environment,
    /// Front (selfie) camera.
    User,
    #[default]
    Any,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
            FacingMode::Any => write!(f, "any"),
        }
    }
}

/// One rung of the acquisition ladder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoConstraints {
    #[serde(default)]
    pub facing: FacingMode,
    #[serde(default)]
    pub ideal_width: Option<u32>,
    #[serde(default)]
    pub ideal_height: Option<u32>,
    #[serde(default)]
    pub min_width: Option<u32>,
    #[serde(default)]
    pub min_height: Option<u32>,
    #[serde(default)]
    pub ideal_frame_rate: Option<u32>,
    #[serde(default)]
    pub min_frame_rate: Option<u32>,
}

impl VideoConstraints {
    /// Rung 1: rear camera, 1280×720 @ 30fps.
    pub fn rear_high() -> Self {
        VideoConstraints {
            facing: FacingMode::Environment,
            ideal_width: Some(1280),
            ideal_height: Some(720),
            min_width: Some(640),
            min_height: Some(480),
            ideal_frame_rate: Some(30),
            min_frame_rate: Some(15),
        }
    }

    /// Rung 2: rear camera, 640×480.
    pub fn rear_standard() -> Self {
        VideoConstraints {
            facing: FacingMode::Environment,
            ideal_width: Some(640),
            ideal_height: Some(480),
            ..Default::default()
        }
    }

    /// Rung 3: front camera, 640×480.
    pub fn front_standard() -> Self {
        VideoConstraints {
            facing: FacingMode::User,
            ..Self::rear_standard()
        }
    }

    /// Rung 4: any camera above a 320×240 floor.
    pub fn minimal() -> Self {
        VideoConstraints {
            min_width: Some(320),
            min_height: Some(240),
            ..Default::default()
        }
    }

    /// Constraint set used only to trigger the permission prompt.
    pub fn permission_probe() -> Self {
        VideoConstraints {
            facing: FacingMode::Environment,
            ..Default::default()
        }
    }

    /// Returns an error description if an ideal value sits below its floor.
    pub fn check(&self) -> Result<(), String> {
        let pairs = [
            ("width", self.ideal_width, self.min_width),
            ("height", self.ideal_height, self.min_height),
            ("frame_rate", self.ideal_frame_rate, self.min_frame_rate),
        ];
        for (name, ideal, min) in pairs {
            if let (Some(ideal), Some(min)) = (ideal, min) {
                if ideal < min {
                    return Err(format!("ideal {} {} is below minimum {}", name, ideal, min));
                }
            }
            if min == Some(0) {
                return Err(format!("minimum {} must be greater than 0", name));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for VideoConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.facing)?;
        if let (Some(w), Some(h)) = (self.ideal_width, self.ideal_height) {
            write!(f, " {}x{}", w, h)?;
        }
        if let (Some(w), Some(h)) = (self.min_width, self.min_height) {
            write!(f, " (min {}x{})", w, h)?;
        }
        if let Some(fps) = self.ideal_frame_rate {
            write!(f, " @{}fps", fps)?;
        }
        Ok(())
    }
}

/// The four-rung fallback ladder, best quality first.
pub fn default_ladder() -> Vec<VideoConstraints> {
    vec![
        VideoConstraints::rear_high(),
        VideoConstraints::rear_standard(),
        VideoConstraints::front_standard(),
        VideoConstraints::minimal(),
    ]
}

// =============================================================================
// Stream & Device Traits
// =============================================================================

/// Lifecycle of the video track(s) inside a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    /// Stopped, either explicitly or because the hardware went away.
    Ended,
}

/// Permission-change notifications from the platform.
pub type PermissionWatch = watch::Receiver<CameraPermissionState>;

/// A live camera stream.
pub trait MediaStream: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn live_track_count(&self) -> usize;

    /// Stops every track. Calling it again is a no-op.
    fn stop_tracks(&self);

    /// Flips to [`TrackState::Ended`] when the tracks stop for any reason.
    fn track_state(&self) -> watch::Receiver<TrackState>;

    /// Most recent decoded frame; `None` until the device delivers one.
    fn latest_frame(&self) -> Option<Arc<Frame>>;
}

/// The platform's camera access API.
pub trait MediaDevices: Send + Sync + 'static {
    type Stream: MediaStream;

    /// Requests a stream matching `constraints`.
    fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> impl Future<Output = Result<Self::Stream, DeviceError>> + Send;

    /// Queries camera permission. `None` when the platform has no query API.
    fn query_permission(&self) -> impl Future<Output = Option<PermissionWatch>> + Send;
}
