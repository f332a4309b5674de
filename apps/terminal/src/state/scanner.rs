//! # Scanner State
//!
//! Owns the scan session controller for the lifetime of the terminal.
//!
//! The camera backend is chosen at compile time:
//! - feature `camera`: [`NokhwaDevices`](scanpos_scan::backends::NokhwaDevices)
//! - otherwise: [`UnavailableDevices`], so `scan` reports "no camera" and
//!   codes are typed with `code <CODE>`.

use std::sync::Arc;

use scanpos_scan::backends::MultiFormatDecoder;
use scanpos_scan::{FrameDecoder, MediaDevices, ScanEventEmitter, ScanResult, ScanSessionController, ScannerConfig};

#[cfg(feature = "camera")]
pub type DefaultDevices = scanpos_scan::backends::NokhwaDevices;

#[cfg(not(feature = "camera"))]
pub type DefaultDevices = scanpos_scan::backends::UnavailableDevices;

#[cfg(feature = "camera")]
fn default_devices(config: &ScannerConfig) -> DefaultDevices {
    scanpos_scan::backends::NokhwaDevices::new(config.camera.rear_index, config.camera.front_index)
}

#[cfg(not(feature = "camera"))]
fn default_devices(_config: &ScannerConfig) -> DefaultDevices {
    scanpos_scan::backends::UnavailableDevices
}

/// Shared handle to the scan controller.
pub struct ScannerState<M: MediaDevices = DefaultDevices, D: FrameDecoder = MultiFormatDecoder> {
    controller: Arc<ScanSessionController<M, D>>,
}

impl<M: MediaDevices, D: FrameDecoder> Clone for ScannerState<M, D> {
    fn clone(&self) -> Self {
        ScannerState {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl ScannerState {
    /// Builds the controller with the compiled-in camera backend and the
    /// multi-format decoder.
    pub fn open(config: &ScannerConfig, emitter: Arc<dyn ScanEventEmitter>) -> ScanResult<Self> {
        let controller = ScanSessionController::new(
            config.clone(),
            Arc::new(default_devices(config)),
            Arc::new(MultiFormatDecoder::new()),
            emitter,
        )?;
        Ok(ScannerState::from_controller(controller))
    }
}

impl<M: MediaDevices, D: FrameDecoder> ScannerState<M, D> {
    pub fn from_controller(controller: ScanSessionController<M, D>) -> Self {
        ScannerState {
            controller: Arc::new(controller),
        }
    }

    pub fn controller(&self) -> &ScanSessionController<M, D> {
        &self.controller
    }
}
