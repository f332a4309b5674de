//! # Video Sink
//!
//! Binds an acquired stream to a renderable surface and waits for the
//! surface to expose a usable frame.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Surface Readiness                                   │
//! │                                                                         │
//! │   HaveNothing ──attach──► HaveMetadata ──frame──► HaveEnoughData        │
//! │        ▲                       (playing, no         (frame with         │
//! │        │                        frame yet)           non-zero dims)     │
//! │        └──────────── detach / tracks stopped ◄──────────┘               │
//! │                                                                         │
//! │   wait_until_ready() polls until ready_state >= HaveCurrentData and    │
//! │   width × height > 0. It never times out; the session controller       │
//! │   decides how long the cashier waits.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace};

use crate::device::MediaStream;
use crate::error::{ScanError, ScanResult};
use crate::frame::Frame;

/// How much data the surface has buffered, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveEnoughData,
}

/// Flags applied to the surface before playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFlags {
    pub muted: bool,
    pub inline: bool,
    pub controls: bool,
}

impl Default for PlaybackFlags {
    fn default() -> Self {
        PlaybackFlags {
            muted: true,
            inline: true,
            controls: false,
        }
    }
}

/// A point-in-time view of the surface.
#[derive(Debug, Clone)]
pub struct SurfaceSnapshot {
    pub ready_state: ReadyState,
    pub width: u32,
    pub height: u32,
    pub frame: Option<Arc<Frame>>,
}

impl SurfaceSnapshot {
    fn empty() -> Self {
        SurfaceSnapshot {
            ready_state: ReadyState::HaveNothing,
            width: 0,
            height: 0,
            frame: None,
        }
    }

    /// Enough data to read a frame, and the frame has a size.
    pub fn is_ready(&self) -> bool {
        self.ready_state >= ReadyState::HaveCurrentData && self.width > 0 && self.height > 0
    }
}

// =============================================================================
// Video Surface
// =============================================================================

#[derive(Default)]
struct SurfaceState {
    stream: Option<Arc<dyn MediaStream>>,
    flags: PlaybackFlags,
    playing: bool,
}

/// The render target a stream is bound to.
#[derive(Default)]
pub struct VideoSurface {
    state: Mutex<SurfaceState>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the source stream. Playback stops until [`play`](Self::play).
    pub fn attach(&self, stream: Arc<dyn MediaStream>, flags: PlaybackFlags) {
        let mut state = self.lock();
        state.stream = Some(stream);
        state.flags = flags;
        state.playing = false;
    }

    pub fn play(&self) -> Result<(), String> {
        let mut state = self.lock();
        let stream = state
            .stream
            .as_ref()
            .ok_or_else(|| "no stream attached".to_string())?;
        if stream.live_track_count() == 0 {
            return Err(format!("stream {} has no live video track", stream.id()));
        }
        state.playing = true;
        Ok(())
    }

    /// Drops the source stream. Does not stop its tracks.
    pub fn detach(&self) {
        let mut state = self.lock();
        state.stream = None;
        state.playing = false;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().stream.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn flags(&self) -> PlaybackFlags {
        self.lock().flags
    }

    /// Reads the current frame once and derives the ready state from it.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        let (stream, playing) = {
            let state = self.lock();
            match &state.stream {
                Some(stream) => (Arc::clone(stream), state.playing),
                None => return SurfaceSnapshot::empty(),
            }
        };

        if stream.live_track_count() == 0 {
            return SurfaceSnapshot::empty();
        }
        if !playing {
            return SurfaceSnapshot {
                ready_state: ReadyState::HaveMetadata,
                ..SurfaceSnapshot::empty()
            };
        }

        match stream.latest_frame() {
            Some(frame) if frame.is_valid() => SurfaceSnapshot {
                ready_state: ReadyState::HaveEnoughData,
                width: frame.width(),
                height: frame.height(),
                frame: Some(frame),
            },
            _ => SurfaceSnapshot {
                ready_state: ReadyState::HaveMetadata,
                ..SurfaceSnapshot::empty()
            },
        }
    }
}

// =============================================================================
// Video Sink
// =============================================================================

/// Binds streams to surfaces and waits for their first frame.
#[derive(Debug, Clone)]
pub struct VideoSink {
    poll_interval: Duration,
    flags: PlaybackFlags,
}

impl VideoSink {
    pub fn new(poll_interval: Duration) -> Self {
        VideoSink {
            poll_interval,
            flags: PlaybackFlags::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Attaches `stream` with muted/inline/no-controls flags and starts playback.
    pub fn bind(&self, stream: Arc<dyn MediaStream>, surface: &VideoSurface) -> ScanResult<()> {
        let id = stream.id().to_string();
        surface.attach(stream, self.flags);
        surface.play().map_err(ScanError::Playback)?;
        debug!(stream = %id, "Stream bound to surface");
        Ok(())
    }

    /// Resolves once the surface shows a frame with non-zero dimensions.
    ///
    /// Returns the number of polls that found the surface not ready. Has no
    /// timeout; wrap it in a cancellation race if the caller needs one.
    pub async fn wait_until_ready(&self, surface: &VideoSurface) -> u32 {
        let mut polls = 0u32;
        loop {
            let snapshot = surface.snapshot();
            if snapshot.is_ready() {
                debug!(
                    polls,
                    width = snapshot.width,
                    height = snapshot.height,
                    "Surface ready"
                );
                return polls;
            }
            polls = polls.saturating_add(1);
            trace!(polls, ready_state = ?snapshot.ready_state, "Surface not ready yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub fn unbind(&self, surface: &VideoSurface) {
        surface.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStream;

    #[test]
    fn test_snapshot_states() {
        let surface = VideoSurface::new();
        assert_eq!(surface.snapshot().ready_state, ReadyState::HaveNothing);

        let stream = MockStream::new("s1", 0);
        surface.attach(Arc::new(stream.clone()), PlaybackFlags::default());
        assert_eq!(surface.snapshot().ready_state, ReadyState::HaveMetadata);
        assert!(!surface.snapshot().is_ready());

        surface.play().unwrap();
        let snapshot = surface.snapshot();
        assert!(snapshot.is_ready());
        assert!(snapshot.frame.is_some());

        stream.stop_tracks();
        assert_eq!(surface.snapshot().ready_state, ReadyState::HaveNothing);
    }

    #[test]
    fn test_bind_sets_flags_and_rejects_dead_stream() {
        let sink = VideoSink::new(Duration::from_millis(100));
        let surface = VideoSurface::new();

        let stream = MockStream::new("s1", 0);
        sink.bind(Arc::new(stream.clone()), &surface).unwrap();
        assert!(surface.is_playing());
        assert_eq!(surface.flags(), PlaybackFlags { muted: true, inline: true, controls: false });

        stream.stop_tracks();
        let err = sink.bind(Arc::new(stream), &surface).unwrap_err();
        assert!(matches!(err, ScanError::Playback(_)));

        sink.unbind(&surface);
        assert!(!surface.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_counts_polls() {
        let sink = VideoSink::new(Duration::from_millis(100));
        let surface = VideoSurface::new();
        sink.bind(Arc::new(MockStream::new("s1", 3)), &surface).unwrap();

        let start = tokio::time::Instant::now();
        assert_eq!(sink.wait_until_ready(&surface).await, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_does_not_time_out() {
        let sink = VideoSink::new(Duration::from_millis(100));
        let surface = VideoSurface::new();
        sink.bind(Arc::new(MockStream::new("s1", u32::MAX)), &surface).unwrap();

        let waited = tokio::time::timeout(Duration::from_secs(60), sink.wait_until_ready(&surface)).await;
        assert!(waited.is_err(), "still waiting after a minute");
    }
}
