//! Decoder seam: turns one frame into at most one code.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use scanpos_core::{DetectionCandidate, Symbology};

use crate::config::DecodeSettings;
use crate::error::DecodeError;
use crate::frame::Frame;

/// Per-session decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeHints {
    pub symbologies: BTreeSet<Symbology>,
    /// Trade latency for recognition robustness.
    pub try_harder: bool,
}

impl DecodeHints {
    pub fn allows(&self, symbology: Symbology) -> bool {
        self.symbologies.contains(&symbology)
    }
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self::from(&DecodeSettings::default())
    }
}

impl From<&DecodeSettings> for DecodeHints {
    fn from(settings: &DecodeSettings) -> Self {
        DecodeHints {
            symbologies: settings.symbologies.clone(),
            try_harder: settings.try_harder,
        }
    }
}

/// A barcode/QR decoding library.
///
/// Implementations may assume they are never called concurrently by the
/// same session.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Returns [`DecodeError::NotFound`] when the frame holds no readable code.
    fn decode(
        &self,
        frame: Arc<Frame>,
        hints: &DecodeHints,
    ) -> impl Future<Output = Result<DetectionCandidate, DecodeError>> + Send;
}
