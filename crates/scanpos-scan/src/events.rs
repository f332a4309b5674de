//! # Scan Events
//!
//! Outbound notifications from a scan session.
//!
//! A session reports exactly one of two things to its host: a confirmed
//! code, or a failure message. Both arrive through [`ScanEventEmitter`],
//! which the terminal implements with a channel and tests implement with
//! a recorder.

use tokio::sync::mpsc;

/// Where a delivered code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    /// Confirmed by the decode loop.
    Camera,
    /// Typed by the cashier.
    Manual,
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionSource::Camera => write!(f, "camera"),
            DetectionSource::Manual => write!(f, "manual"),
        }
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receiver of session outcomes.
pub trait ScanEventEmitter: Send + Sync {
    /// A code was confirmed or entered. Called at most once per session.
    fn on_code_detected(&self, code: &str);

    /// The session failed. Called once per failure, never for decoder noise.
    fn on_error(&self, message: &str);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl ScanEventEmitter for NoOpEmitter {
    fn on_code_detected(&self, _code: &str) {}
    fn on_error(&self, _message: &str) {}
}

// =============================================================================
// Channel Emitter
// =============================================================================

/// An outcome forwarded over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    CodeDetected(String),
    Error(String),
}

/// Forwards session outcomes into an unbounded channel.
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ScanEvent>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelEmitter { tx }, rx)
    }
}

impl ScanEventEmitter for ChannelEmitter {
    fn on_code_detected(&self, code: &str) {
        // Receiver gone means the host is shutting down.
        let _ = self.tx.send(ScanEvent::CodeDetected(code.to_string()));
    }

    fn on_error(&self, message: &str) {
        let _ = self.tx.send(ScanEvent::Error(message.to_string()));
    }
}
