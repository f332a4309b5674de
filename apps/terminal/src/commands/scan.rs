//! Scanner commands.
//!
//! Detections and failures are reported through the controller's event
//! emitter, not through these return values. `start_scan` returning an
//! error means the same error was already emitted.

use scanpos_core::{CameraPermissionState, SAMPLE_PRODUCT_CODE};
use scanpos_scan::{FrameDecoder, MediaDevices, PermissionRequest, ScanError, ScanStatus};
use tracing::debug;

use crate::error::ApiError;
use crate::state::ScannerState;

/// Starts a scan session and waits until frames are being decoded.
///
/// A session cancelled by `stop` or a manual code is not an error.
pub async fn start_scan<M: MediaDevices, D: FrameDecoder>(
    scanner: &ScannerState<M, D>,
) -> Result<(), ApiError> {
    debug!("start_scan command");
    match scanner.controller().start().await {
        Ok(()) => Ok(()),
        Err(ScanError::Cancelled) => {
            debug!("Scan start superseded");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn stop_scan<M: MediaDevices, D: FrameDecoder>(scanner: &ScannerState<M, D>) {
    debug!("stop_scan command");
    scanner.controller().stop();
}

/// Delivers a typed code as if it had been scanned.
pub fn submit_code<M: MediaDevices, D: FrameDecoder>(
    scanner: &ScannerState<M, D>,
    input: &str,
) -> Result<String, ApiError> {
    debug!("submit_code command");
    Ok(scanner.controller().submit_manual_code(input)?)
}

/// Delivers the demo product code.
pub fn submit_sample<M: MediaDevices, D: FrameDecoder>(
    scanner: &ScannerState<M, D>,
) -> Result<String, ApiError> {
    submit_code(scanner, SAMPLE_PRODUCT_CODE)
}

pub async fn check_permission<M: MediaDevices, D: FrameDecoder>(
    scanner: &ScannerState<M, D>,
) -> CameraPermissionState {
    scanner.controller().check_permission().await
}

/// Asks the platform for camera access.
pub async fn request_permission<M: MediaDevices, D: FrameDecoder>(
    scanner: &ScannerState<M, D>,
) -> Result<CameraPermissionState, ApiError> {
    match scanner.controller().request_permission().await {
        PermissionRequest::Granted => Ok(CameraPermissionState::Granted),
        other => Err(other
            .into_error()
            .map(ApiError::from)
            .unwrap_or_else(|| ApiError::internal("Camera permission request failed"))),
    }
}

pub fn scan_status<M: MediaDevices, D: FrameDecoder>(scanner: &ScannerState<M, D>) -> ScanStatus {
    scanner.controller().status()
}
