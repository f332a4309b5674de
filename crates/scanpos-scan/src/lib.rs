//! # scanpos-scan: Scan-Acquisition Engine
//!
//! Camera lifecycle, decode loop and session control for the ScanPOS
//! terminal. Turns "the cashier pressed scan" into either one confirmed code
//! or one typed failure.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Scan Pipeline                                   │
//! │                                                                         │
//! │  PermissionGate ──► StreamAcquirer ──► VideoSink ──► DecodeLoop         │
//! │  query / request    4-rung ladder      bind, wait     adaptive cadence  │
//! │                     StreamLease        first frame    + confirmer       │
//! │                                                           │             │
//! │                                                           ▼             │
//! │               ScanSessionController ──► ScanEventEmitter                │
//! │               start / stop / manual     on_code_detected | on_error     │
//! │                         ▲                                               │
//! │  submit_manual_code ────┘ (bypasses the camera entirely)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Platform Seams
//!
//! The engine never talks to hardware directly. It is generic over:
//! - [`MediaDevices`] / [`MediaStream`] - camera access
//! - [`FrameDecoder`] - barcode/QR decoding
//!
//! Bundled implementations live in [`backends`]; scriptable doubles live in
//! `mock`, behind the `mock` feature.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scanpos_scan::{backends::{MultiFormatDecoder, UnavailableDevices}, ScanSessionBuilder, ScannerConfig};
//!
//! # async fn run() -> scanpos_scan::ScanResult<()> {
//! let controller = ScanSessionBuilder::new(ScannerConfig::default())
//!     .with_devices(Arc::new(UnavailableDevices))
//!     .with_decoder(Arc::new(MultiFormatDecoder::new()))
//!     .build()?;
//! controller.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod acquirer;
pub mod backends;
pub mod config;
pub mod decode_loop;
pub mod decoder;
pub mod device;
pub mod error;
pub mod events;
pub mod frame;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod permission;
pub mod session;
pub mod sink;

pub use acquirer::{StreamAcquirer, StreamLease};
pub use config::{CameraSettings, DecodeSettings, ScannerConfig};
pub use decode_loop::{AttemptOutcome, AttemptReport, DecodeLoop};
pub use decoder::{DecodeHints, FrameDecoder};
pub use device::{FacingMode, MediaDevices, MediaStream, TrackState, VideoConstraints};
pub use error::{AcquireError, DecodeError, DeviceError, DeviceFailure, ScanError, ScanResult};
pub use events::{ChannelEmitter, DetectionSource, NoOpEmitter, ScanEvent, ScanEventEmitter};
pub use frame::Frame;
pub use permission::{PermissionGate, PermissionRequest};
pub use session::{FailureReason, ScanPhase, ScanSessionBuilder, ScanSessionController, ScanStatus};
pub use sink::{PlaybackFlags, ReadyState, SurfaceSnapshot, VideoSink, VideoSurface};
