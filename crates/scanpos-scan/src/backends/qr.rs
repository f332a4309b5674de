//! QR decoding with `rqrr`.
//!
//! The normal pass binarizes the luma frame adaptively. With `try_harder`
//! set, frames that yield nothing are retried with a contrast stretch, a
//! fixed mid threshold, and a half-resolution copy.

use std::sync::Arc;

use rqrr::PreparedImage;
use tracing::trace;

use scanpos_core::{DetectionCandidate, Symbology};

use crate::decoder::{DecodeHints, FrameDecoder};
use crate::error::DecodeError;
use crate::frame::Frame;

/// [`FrameDecoder`] that recognises QR codes only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        RqrrDecoder
    }
}

impl FrameDecoder for RqrrDecoder {
    async fn decode(&self, frame: Arc<Frame>, hints: &DecodeHints) -> Result<DetectionCandidate, DecodeError> {
        if !hints.allows(Symbology::Qr) {
            return Err(DecodeError::NotFound);
        }
        if !frame.is_valid() {
            return Err(DecodeError::Failed(format!(
                "frame buffer holds {} bytes for {}x{}",
                frame.pixels().len(),
                frame.width(),
                frame.height()
            )));
        }

        let try_harder = hints.try_harder;
        let text = tokio::task::spawn_blocking(move || decode_qr(&frame, try_harder))
            .await
            .map_err(|e| DecodeError::Failed(format!("decoder task failed: {}", e)))?;

        text.map(|text| DetectionCandidate::new(text, Symbology::Qr))
            .ok_or(DecodeError::NotFound)
    }
}

/// Blocking QR pass over one frame. Also the QR fallback of
/// [`MultiFormatDecoder`](super::MultiFormatDecoder).
pub(crate) fn decode_qr(frame: &Frame, try_harder: bool) -> Option<String> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);

    if let Some(text) = decode_greyscale(frame.pixels(), w, h) {
        return Some(text);
    }
    if !try_harder {
        return None;
    }

    let stretched = stretch_contrast(frame.pixels());
    if let Some(text) = decode_greyscale(&stretched, w, h) {
        trace!("QR decoded after contrast stretch");
        return Some(text);
    }

    if let Some(text) = decode_threshold(&stretched, w, h, 128) {
        trace!("QR decoded with fixed threshold");
        return Some(text);
    }

    let half = frame.downscale_half()?;
    decode_greyscale(half.pixels(), half.width() as usize, half.height() as usize)
}

// A located grid that fails to decode counts as a partial read, not a fault.
fn decode_greyscale(grey: &[u8], w: usize, h: usize) -> Option<String> {
    let mut img = PreparedImage::prepare_from_greyscale(w, h, |x, y| grey[y * w + x]);
    img.detect_grids()
        .iter()
        .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
}

fn decode_threshold(grey: &[u8], w: usize, h: usize, threshold: u8) -> Option<String> {
    let mut img = PreparedImage::prepare_from_bitmap(w, h, |x, y| grey[y * w + x] < threshold);
    img.detect_grids()
        .iter()
        .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
}

/// Stretches luma to the full 0..=255 range.
fn stretch_contrast(grey: &[u8]) -> Vec<u8> {
    let (lo, hi) = grey
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi <= lo {
        return grey.to_vec();
    }
    let span = (hi - lo) as u32;
    grey.iter()
        .map(|&v| (((v - lo) as u32 * 255) / span) as u8)
        .collect()
}
