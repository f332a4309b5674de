//! # Decode Loop
//!
//! Repeatedly decodes the surface's current frame until a code is confirmed
//! or the session is cancelled.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Self-Rescheduling Loop                              │
//! │                                                                         │
//! │   ┌──► run_once(surface) ─────────────────────────────┐                │
//! │   │      ├ surface not ready ► Skipped   (cadence kept)│                │
//! │   │      ├ no code           ► NotFound  (confirmer    │                │
//! │   │      │                                reset, slow) │                │
//! │   │      ├ decoder fault     ► Failed    (reset,       │                │
//! │   │      │                                slower)      │                │
//! │   │      └ candidate         ► Detected  (observe,     │                │
//! │   │                                       faster)      │                │
//! │   │                                                    ▼                │
//! │   │                                       confirmed? ──yes──► return    │
//! │   │                                           │ no                      │
//! │   └──────── sleep(cadence.interval()) ◄──────┘                         │
//! │                                                                         │
//! │   The next attempt is scheduled only after the previous one finished,  │
//! │   so a session never has two decodes in flight. Every await is raced  │
//! │   against the session's cancellation token.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use scanpos_core::{
    CadencePolicy, ConfirmPolicy, DecodeCadence, DetectionCandidate, DetectionConfirmer, Observation,
};

use crate::decoder::{DecodeHints, FrameDecoder};
use crate::error::DecodeError;
use crate::sink::VideoSurface;

/// Result of a single decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Surface had no usable frame; the decoder was not called.
    Skipped,
    NotFound,
    Detected(DetectionCandidate),
    /// Unexpected decoder fault. Counted, never surfaced.
    Failed(String),
}

/// What the loop reports after each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    /// 1-based, including skipped attempts.
    pub attempt: u64,
    pub outcome: AttemptOutcome,
    /// Delay before the next attempt.
    pub interval_ms: u64,
    pub consecutive_matches: u32,
    pub last_value: Option<String>,
}

/// Drives a [`FrameDecoder`] against a [`VideoSurface`].
pub struct DecodeLoop<D: FrameDecoder> {
    decoder: Arc<D>,
    hints: DecodeHints,
}

impl<D: FrameDecoder> DecodeLoop<D> {
    pub fn new(decoder: Arc<D>, hints: DecodeHints) -> Self {
        DecodeLoop { decoder, hints }
    }

    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }

    /// Makes one attempt against the surface's current frame.
    pub async fn run_once(&self, surface: &VideoSurface) -> AttemptOutcome {
        let snapshot = surface.snapshot();
        if !snapshot.is_ready() {
            return AttemptOutcome::Skipped;
        }
        let Some(frame) = snapshot.frame else {
            return AttemptOutcome::Skipped;
        };

        match self.decoder.decode(frame, &self.hints).await {
            Ok(candidate) if self.hints.allows(candidate.format) => AttemptOutcome::Detected(candidate),
            Ok(candidate) => {
                trace!(format = %candidate.format, "Ignoring candidate of disabled symbology");
                AttemptOutcome::NotFound
            }
            Err(DecodeError::NotFound) => AttemptOutcome::NotFound,
            Err(DecodeError::Failed(message)) => AttemptOutcome::Failed(message),
        }
    }

    /// Runs attempts until a code is confirmed (`Some`) or `cancel` fires
    /// (`None`). `on_attempt` sees every attempt, in order.
    pub async fn run<F>(
        &self,
        surface: &VideoSurface,
        cancel: &CancellationToken,
        confirm: ConfirmPolicy,
        cadence: CadencePolicy,
        mut on_attempt: F,
    ) -> Option<String>
    where
        F: FnMut(&AttemptReport) + Send,
    {
        let mut confirmer = DetectionConfirmer::new(confirm);
        let mut cadence = DecodeCadence::new(cadence);
        let mut attempt = 0u64;

        loop {
            if cancel.is_cancelled() {
                return None;
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                outcome = self.run_once(surface) => outcome,
            };

            let mut confirmed = None;
            match &outcome {
                AttemptOutcome::Skipped => {
                    cadence = cadence.on_skip();
                }
                AttemptOutcome::NotFound => {
                    trace!(attempt, "No code in frame");
                    confirmer.observe_nothing();
                    cadence = cadence.on_not_found();
                }
                AttemptOutcome::Failed(message) => {
                    debug!(attempt, error = %message, "Decoder fault");
                    confirmer.observe_nothing();
                    cadence = cadence.on_error();
                }
                AttemptOutcome::Detected(candidate) => match confirmer.observe(&candidate.text) {
                    Observation::TooShort => {
                        trace!(attempt, "Ignoring too-short read");
                        cadence = cadence.on_not_found();
                    }
                    Observation::Confirmed(code) => {
                        cadence = cadence.on_success();
                        confirmed = Some(code);
                    }
                    Observation::Pending { count, .. } => {
                        debug!(attempt, code = %candidate.text, count, "Unconfirmed read");
                        cadence = cadence.on_success();
                    }
                    Observation::AlreadyConfirmed => {
                        cadence = cadence.on_success();
                    }
                },
            }

            on_attempt(&AttemptReport {
                attempt,
                outcome,
                interval_ms: cadence.interval_ms,
                consecutive_matches: confirmer.consecutive_matches(),
                last_value: confirmer.last_value().map(str::to_string),
            });

            if let Some(code) = confirmed {
                debug!(attempt, code = %code, "Detection confirmed");
                return Some(code);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(cadence.interval()) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DecodeStep, MockStream, ScriptedDecoder};
    use crate::sink::PlaybackFlags;
    use scanpos_core::Symbology;

    fn playing_surface(warmup: u32) -> VideoSurface {
        let surface = VideoSurface::new();
        surface.attach(Arc::new(MockStream::new("s1", warmup)), PlaybackFlags::default());
        surface.play().unwrap();
        surface
    }

    fn decode_loop(decoder: &Arc<ScriptedDecoder>) -> DecodeLoop<ScriptedDecoder> {
        DecodeLoop::new(Arc::clone(decoder), DecodeHints::default())
    }

    #[tokio::test]
    async fn test_run_once_skips_when_not_ready() {
        let decoder = Arc::new(ScriptedDecoder::new(vec![]));
        let surface = VideoSurface::new();

        assert_eq!(decode_loop(&decoder).run_once(&surface).await, AttemptOutcome::Skipped);
        assert_eq!(decoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_once_filters_disabled_symbology() {
        let decoder = Arc::new(ScriptedDecoder::new(vec![DecodeStep::found_as(
            "4902505130267",
            Symbology::Ean13,
        )]));
        let hints = DecodeHints {
            symbologies: [Symbology::Qr].into_iter().collect(),
            try_harder: true,
        };
        let decode_loop = DecodeLoop::new(Arc::clone(&decoder), hints);

        assert_eq!(decode_loop.run_once(&playing_surface(0)).await, AttemptOutcome::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_after_two_consecutive_reads() {
        let decoder = Arc::new(ScriptedDecoder::new(vec![
            DecodeStep::NotFound,
            DecodeStep::found("4902505130267"),
            DecodeStep::found("4902505130267"),
        ]));
        let surface = playing_surface(0);
        let cancel = CancellationToken::new();
        let mut reports = Vec::new();

        let code = decode_loop(&decoder)
            .run(&surface, &cancel, ConfirmPolicy::default(), CadencePolicy::default(), |r| {
                reports.push(r.clone())
            })
            .await;

        assert_eq!(code.as_deref(), Some("4902505130267"));
        assert_eq!(decoder.calls(), 3);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].consecutive_matches, 1);
        assert_eq!(reports[2].consecutive_matches, 2);
        assert_eq!(decoder.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interleaved_reads_do_not_confirm() {
        let decoder = Arc::new(ScriptedDecoder::new(vec![
            DecodeStep::found("4902505130267"),
            DecodeStep::found("1234567890123"),
            DecodeStep::found("4902505130267"),
        ]));
        let surface = playing_surface(0);
        let cancel = CancellationToken::new();
        let mut last = None;

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            decode_loop(&decoder).run(
                &surface,
                &cancel,
                ConfirmPolicy::default(),
                CadencePolicy::default(),
                |r| {
                    if r.attempt == 3 {
                        last = Some(r.clone());
                    }
                },
            ),
        )
        .await;

        // Script exhausted: the decoder keeps answering NotFound.
        assert!(result.is_err());
        let third = last.unwrap();
        assert_eq!(third.consecutive_matches, 1);
        assert_eq!(third.last_value.as_deref(), Some("4902505130267"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoder_faults_slow_to_error_ceiling() {
        let decoder = Arc::new(ScriptedDecoder::new(
            (0..6).map(|_| DecodeStep::Fail("wasm trap".into())).collect(),
        ));
        let surface = playing_surface(0);
        let cancel = CancellationToken::new();
        let mut intervals = Vec::new();

        let cancel_after = cancel.clone();
        let _ = decode_loop(&decoder)
            .run(&surface, &cancel, ConfirmPolicy::default(), CadencePolicy::default(), |r| {
                assert!(matches!(r.outcome, AttemptOutcome::Failed(_)) || r.attempt > 6);
                intervals.push(r.interval_ms);
                if r.attempt == 6 {
                    cancel_after.cancel();
                }
            })
            .await;

        assert_eq!(intervals, vec![200, 250, 300, 300, 300, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_leave_cadence_unchanged() {
        let decoder = Arc::new(ScriptedDecoder::new(vec![]));
        let surface = VideoSurface::new();
        let cancel = CancellationToken::new();
        let cancel_after = cancel.clone();
        let mut seen = Vec::new();

        let _ = decode_loop(&decoder)
            .run(&surface, &cancel, ConfirmPolicy::default(), CadencePolicy::default(), |r| {
                seen.push((r.outcome.clone(), r.interval_ms));
                if r.attempt == 4 {
                    cancel_after.cancel();
                }
            })
            .await;

        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(o, ms)| *o == AttemptOutcome::Skipped && *ms == 150));
        assert_eq!(decoder.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_decode_returns_none() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let decoder = Arc::new(ScriptedDecoder::new(vec![DecodeStep::Hold(
            Arc::clone(&gate),
            Box::new(DecodeStep::found("4902505130267")),
        )]));
        let surface = playing_surface(0);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let code = decode_loop(&decoder)
            .run(&surface, &cancel, ConfirmPolicy::default(), CadencePolicy::default(), |_| {})
            .await;

        assert_eq!(code, None);
        assert_eq!(decoder.calls(), 1);
        assert_eq!(decoder.in_flight(), 0, "held decode was dropped");
    }
}
