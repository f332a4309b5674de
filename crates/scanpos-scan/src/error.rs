//! # Scan Error Types
//!
//! Error types for camera acquisition, decoding and scan sessions.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Platform      │  │   Decoder       │  │     Session (surfaced)  │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  DeviceError    │  │  DecodeError    │  │  PermissionDenied       │ │
//! │  │   └ DeviceFail- │  │   ├ NotFound    │  │  DeviceUnavailable      │ │
//! │  │     ure kind    │  │   │  (silent)   │  │  Playback               │ │
//! │  │  AcquireError   │  │   └ Failed      │  │  Cancelled              │ │
//! │  │   (ladder done) │  │     (counted)   │  │  Validation / Config    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Decoder errors never leave the decode loop; they only tune cadence.   │
//! │  Session errors are reported once through `on_error`.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use scanpos_core::ValidationError;
use thiserror::Error;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Platform Errors
// =============================================================================

/// Classification of a failed camera request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFailure {
    /// The user or platform refused camera access.
    PermissionDenied,
    /// No camera matches the request.
    NotFound,
    /// The camera exists but another process holds it.
    Busy,
    Other,
}

impl std::fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceFailure::PermissionDenied => write!(f, "permission denied"),
            DeviceFailure::NotFound => write!(f, "device not found"),
            DeviceFailure::Busy => write!(f, "device busy"),
            DeviceFailure::Other => write!(f, "device error"),
        }
    }
}

/// A camera request rejected by the platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DeviceError {
    pub kind: DeviceFailure,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceFailure, message: impl Into<String>) -> Self {
        DeviceError {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(DeviceFailure::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DeviceFailure::NotFound, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(DeviceFailure::Busy, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DeviceFailure::Other, message)
    }

    /// Best-effort classification of a free-form platform message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("permission")
            || lower.contains("denied")
            || lower.contains("not allowed")
        {
            DeviceFailure::PermissionDenied
        } else if lower.contains("busy") || lower.contains("in use") {
            DeviceFailure::Busy
        } else if lower.contains("not found")
            || lower.contains("no such")
            || lower.contains("no device")
        {
            DeviceFailure::NotFound
        } else {
            DeviceFailure::Other
        };
        DeviceError { kind, message }
    }
}

/// Every rung of the constraint ladder was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("camera unavailable after {attempts} constraint set(s): {last}")]
pub struct AcquireError {
    pub attempts: usize,
    /// Error of the last rung tried; its kind classifies the whole failure.
    pub last: DeviceError,
}

impl AcquireError {
    pub fn kind(&self) -> DeviceFailure {
        self.last.kind
    }
}

// =============================================================================
// Decoder Errors
// =============================================================================

/// Outcome of a decode attempt that produced no candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// No code in the frame. Expected on most attempts.
    #[error("no code found in frame")]
    NotFound,

    /// Unexpected decoder fault.
    #[error("decoder failed: {0}")]
    Failed(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors surfaced by the scan session.
///
/// `Display` is the message handed to `on_error`, so it is written for the
/// cashier rather than for a log.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// Camera access refused. Not retried automatically.
    #[error("Camera access was denied. Allow camera access for this application in your system or browser settings, then try again.")]
    PermissionDenied,

    /// No usable camera, or the camera is held by another process.
    #[error("{}", device_unavailable_message(.kind, .message))]
    DeviceUnavailable { kind: DeviceFailure, message: String },

    /// The stream was acquired but the surface refused to play it.
    #[error("Failed to start video playback: {0}")]
    Playback(String),

    /// The session was stopped or superseded while this operation waited.
    #[error("Scan session was cancelled")]
    Cancelled,

    /// Manual input rejected.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Scanner configuration rejected at startup.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),
}

fn device_unavailable_message(kind: &DeviceFailure, message: &str) -> String {
    match kind {
        DeviceFailure::NotFound => "No camera was found. Connect a camera or enter the code manually.".to_string(),
        DeviceFailure::Busy => {
            "The camera is being used by another application. Close it and try again.".to_string()
        }
        DeviceFailure::PermissionDenied => format!("Camera access was denied: {}", message),
        DeviceFailure::Other => format!("Camera error: {}", message),
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DeviceError> for ScanError {
    fn from(err: DeviceError) -> Self {
        match err.kind {
            DeviceFailure::PermissionDenied => ScanError::PermissionDenied,
            kind => ScanError::DeviceUnavailable {
                kind,
                message: err.message,
            },
        }
    }
}

impl From<AcquireError> for ScanError {
    fn from(err: AcquireError) -> Self {
        err.last.into()
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if trying again later may succeed without user action
    /// outside the application.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::DeviceUnavailable {
                kind: DeviceFailure::Busy | DeviceFailure::Other,
                ..
            } | ScanError::Playback(_)
        )
    }

    /// Returns true if the user must change a permission setting first.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, ScanError::PermissionDenied)
    }

    /// Returns true for camera hardware problems.
    pub fn is_device_error(&self) -> bool {
        matches!(self, ScanError::DeviceUnavailable { .. } | ScanError::Playback(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }

    /// Message suitable for the cashier.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_classification() {
        assert_eq!(
            DeviceError::classify("NotAllowedError: Permission denied").kind,
            DeviceFailure::PermissionDenied
        );
        assert_eq!(
            DeviceError::classify("Device or resource busy").kind,
            DeviceFailure::Busy
        );
        assert_eq!(
            DeviceError::classify("No such file or directory").kind,
            DeviceFailure::NotFound
        );
        assert_eq!(
            DeviceError::classify("unsupported pixel format").kind,
            DeviceFailure::Other
        );
    }

    #[test]
    fn test_acquire_error_maps_to_session_error() {
        let denied = AcquireError {
            attempts: 4,
            last: DeviceError::permission_denied("NotAllowedError"),
        };
        assert_eq!(ScanError::from(denied), ScanError::PermissionDenied);

        let busy = AcquireError {
            attempts: 4,
            last: DeviceError::busy("in use"),
        };
        let err = ScanError::from(busy);
        assert!(err.is_device_error());
        assert!(err.is_retryable());
        assert!(err.user_message().contains("another application"));
    }

    #[test]
    fn test_error_categories() {
        assert!(ScanError::PermissionDenied.is_permission_error());
        assert!(!ScanError::PermissionDenied.is_retryable());
        assert!(ScanError::Cancelled.is_cancelled());

        let not_found: ScanError = DeviceError::not_found("no camera").into();
        assert!(!not_found.is_retryable());
        assert!(not_found.to_string().starts_with("No camera was found"));
    }

    #[test]
    fn test_other_device_error_keeps_detail() {
        let err: ScanError = DeviceError::other("unsupported pixel format").into();
        assert_eq!(err.to_string(), "Camera error: unsupported pixel format");
    }
}
