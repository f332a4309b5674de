//! Multi-format decoding with `rxing`.
//!
//! Reads every symbology in [`Symbology::ALL`]: retail 1D codes (EAN/JAN,
//! UPC, Code128, Code39, ITF, Codabar) and QR. The configured symbology set
//! becomes the reader's possible formats and `try_harder` its
//! exhaustive mode.
//!
//! ```text
//! Frame (luma) ──► rxing MultiFormatReader ──► found ──► DetectionCandidate
//!                        │ not found
//!                        ▼  (QR allowed && try_harder)
//!                  rqrr QR passes ──────────► found ──► DetectionCandidate
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary, Exceptions};
use tracing::trace;

use scanpos_core::{DetectionCandidate, Symbology};

use super::qr::decode_qr;
use crate::decoder::{DecodeHints, FrameDecoder};
use crate::error::DecodeError;
use crate::frame::Frame;

/// [`FrameDecoder`] for product barcodes and QR codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatDecoder;

impl MultiFormatDecoder {
    pub fn new() -> Self {
        MultiFormatDecoder
    }
}

impl FrameDecoder for MultiFormatDecoder {
    async fn decode(&self, frame: Arc<Frame>, hints: &DecodeHints) -> Result<DetectionCandidate, DecodeError> {
        if hints.symbologies.is_empty() {
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

        let hints = hints.clone();
        tokio::task::spawn_blocking(move || decode_frame(&frame, &hints))
            .await
            .map_err(|e| DecodeError::Failed(format!("decoder task failed: {}", e)))?
    }
}

fn decode_frame(frame: &Frame, hints: &DecodeHints) -> Result<DetectionCandidate, DecodeError> {
    let mut dictionary = reader_hints(hints);
    let result = rxing::helpers::detect_in_luma_with_hints(
        frame.pixels().to_vec(),
        frame.width(),
        frame.height(),
        None,
        &mut dictionary,
    );

    match result {
        Ok(found) => {
            let text = found.getText().to_string();
            match to_symbology(found.getBarcodeFormat()) {
                Some(symbology) if hints.allows(symbology) => Ok(DetectionCandidate::new(text, symbology)),
                // The reader can report a related format (UPC-A inside EAN-13).
                _ => Err(DecodeError::NotFound),
            }
        }
        Err(err) if is_miss(&err) => {
            if hints.allows(Symbology::Qr) && hints.try_harder {
                if let Some(text) = decode_qr(frame, true) {
                    trace!("QR decoded by fallback pass");
                    return Ok(DetectionCandidate::new(text, Symbology::Qr));
                }
            }
            Err(DecodeError::NotFound)
        }
        Err(err) => Err(DecodeError::Failed(err.to_string())),
    }
}

/// Not-found, checksum and format errors are partial reads, not faults.
fn is_miss(err: &Exceptions) -> bool {
    matches!(
        err,
        Exceptions::NotFoundException(_) | Exceptions::ChecksumException(_) | Exceptions::FormatException(_)
    )
}

fn reader_hints(hints: &DecodeHints) -> DecodingHintDictionary {
    let formats: HashSet<BarcodeFormat> = hints.symbologies.iter().map(|s| to_format(*s)).collect();
    let mut dictionary: DecodingHintDictionary = HashMap::new();
    dictionary.insert(DecodeHintType::POSSIBLE_FORMATS, DecodeHintValue::PossibleFormats(formats));
    dictionary.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(hints.try_harder));
    dictionary
}

fn to_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Qr => BarcodeFormat::QR_CODE,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Itf => BarcodeFormat::ITF,
        Symbology::Codabar => BarcodeFormat::CODABAR,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
    }
}

fn to_symbology(format: &BarcodeFormat) -> Option<Symbology> {
    Some(match format {
        BarcodeFormat::QR_CODE => Symbology::Qr,
        BarcodeFormat::EAN_13 => Symbology::Ean13,
        BarcodeFormat::EAN_8 => Symbology::Ean8,
        BarcodeFormat::CODE_128 => Symbology::Code128,
        BarcodeFormat::CODE_39 => Symbology::Code39,
        BarcodeFormat::ITF => Symbology::Itf,
        BarcodeFormat::CODABAR => Symbology::Codabar,
        BarcodeFormat::UPC_A => Symbology::UpcA,
        BarcodeFormat::UPC_E => Symbology::UpcE,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAN_PEN: &str = "4902505130267";

    const L_CODES: [&str; 10] = [
        "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011", "0110111", "0001011",
    ];
    const PARITY: [&str; 10] = [
        "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL", "LGGLGL",
    ];

    /// Module pattern ('1' = bar) for a 13-digit EAN.
    fn ean13_modules(code: &str) -> String {
        let digits: Vec<usize> = code.bytes().map(|b| (b - b'0') as usize).collect();
        let r_code = |d: usize| -> String {
            L_CODES[d].chars().map(|c| if c == '0' { '1' } else { '0' }).collect()
        };

        let mut modules = String::from("101");
        for (i, parity) in PARITY[digits[0]].chars().enumerate() {
            let d = digits[i + 1];
            match parity {
                'L' => modules.push_str(L_CODES[d]),
                _ => modules.extend(r_code(d).chars().rev()),
            }
        }
        modules.push_str("01010");
        for &d in &digits[7..] {
            modules.push_str(&r_code(d));
        }
        modules.push_str("101");
        modules
    }

    fn render_ean13(code: &str) -> Frame {
        const MODULE_PX: usize = 4;
        const QUIET: usize = 12;
        let modules = ean13_modules(code);
        let width = (modules.len() + 2 * QUIET) * MODULE_PX;
        let height = 80;

        let row: Vec<u8> = (0..width)
            .map(|x| {
                let m = x / MODULE_PX;
                let bar = m >= QUIET && modules.as_bytes().get(m - QUIET) == Some(&b'1');
                if bar {
                    0
                } else {
                    255
                }
            })
            .collect();
        let pixels = row.repeat(height);
        Frame::new(pixels, width as u32, height as u32, 1)
    }

    fn hints(symbologies: &[Symbology]) -> DecodeHints {
        DecodeHints {
            symbologies: symbologies.iter().copied().collect(),
            try_harder: true,
        }
    }

    #[test]
    fn test_ean13_pattern_width() {
        assert_eq!(ean13_modules(JAN_PEN).len(), 95);
    }

    #[tokio::test]
    async fn test_decodes_retail_barcode() {
        let frame = Arc::new(render_ean13(JAN_PEN));
        let found = MultiFormatDecoder::new()
            .decode(frame, &DecodeHints::default())
            .await
            .unwrap();
        assert_eq!(found.text, JAN_PEN);
        assert_eq!(found.format, Symbology::Ean13);
    }

    #[tokio::test]
    async fn test_disabled_symbology_is_not_reported() {
        let frame = Arc::new(render_ean13(JAN_PEN));
        let result = MultiFormatDecoder::new().decode(frame, &hints(&[Symbology::Qr])).await;
        assert_eq!(result, Err(DecodeError::NotFound));
    }

    #[tokio::test]
    async fn test_blank_frame_is_not_found() {
        let frame = Arc::new(Frame::new(vec![255; 120 * 80], 120, 80, 1));
        let result = MultiFormatDecoder::new().decode(frame, &DecodeHints::default()).await;
        assert_eq!(result, Err(DecodeError::NotFound));
    }

    #[tokio::test]
    async fn test_empty_symbology_set_skips_decoding() {
        let frame = Arc::new(Frame::new(vec![0; 10], 4, 4, 1));
        let result = MultiFormatDecoder::new().decode(frame, &hints(&[])).await;
        assert_eq!(result, Err(DecodeError::NotFound));
    }

    #[test]
    fn test_format_mapping_covers_every_symbology() {
        for symbology in Symbology::ALL {
            assert_eq!(to_symbology(&to_format(symbology)), Some(symbology));
        }
        assert_eq!(to_symbology(&BarcodeFormat::DATA_MATRIX), None);
    }
}
